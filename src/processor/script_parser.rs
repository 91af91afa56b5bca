//! Recursive-descent parser that turns the scanned token list into `Rules`.
//!
//! Parsing stops at the first structural error; whatever was assembled up
//! to that point is still handed back together with the error.

use std::collections::HashMap;

use glam::{Mat3, Mat4, Vec3};
use tracing::debug;

use super::error::ParseError;
use super::token::{Token, TokenKind};
use crate::color::{ColorPool, Rgba};
use crate::model::{
    ActionKind, Blend, DepthOverride, Rule, RuleAction, Rules, Setting, Transformation,
    TransformationLoop,
};

/// Value bound by `#define`.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Definition {
    Number(f64),
    Color(Rgba),
}

pub struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    defines: HashMap<String, Definition>,
    rules: Rules,
}

impl<'t> Parser<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            defines: HashMap::new(),
            rules: Rules::default(),
        }
    }

    /// Returns the program built so far and the error that stopped parsing,
    /// if any. The program is not validated or finalized here.
    pub fn parse(mut self) -> (Rules, Option<ParseError>) {
        let failure = self.parse_program().err();
        debug!(
            initial = self.rules.initial.len(),
            named = self.rules.rule_count(),
            failed = failure.is_some(),
            "parsed program"
        );
        (self.rules, failure)
    }

    fn parse_program(&mut self) -> Result<(), ParseError> {
        while let Some(kind) = self.peek_kind() {
            match kind {
                TokenKind::Set => self.parse_set()?,
                TokenKind::Rule => self.parse_rule()?,
                TokenKind::Define => self.parse_define()?,
                _ => self.parse_initial_rule()?,
            }
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────
    // token helpers
    // ─────────────────────────────────────────────────────

    fn peek(&self) -> Option<&'t Token> {
        let tokens = self.tokens;
        tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn last_line(&self) -> usize {
        self.tokens.last().map_or(1, |t| t.line)
    }

    fn next(&mut self) -> Result<&'t Token, ParseError> {
        let token = self
            .peek()
            .ok_or_else(|| ParseError::syntax("Unexpected end of input", self.last_line()))?;
        self.pos += 1;
        Ok(token)
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<&'t Token, ParseError> {
        let token = self.next()?;
        if token.kind == kind {
            Ok(token)
        } else {
            Err(ParseError::syntax(format!("Expected {what}"), token.line))
        }
    }

    fn lookup(&self, name: &str) -> Option<Definition> {
        self.defines.get(name).copied()
    }

    /// A number literal, or a name bound to one.
    fn peek_number(&self) -> bool {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Number => true,
            Some(t) if t.kind == TokenKind::Variable => matches!(
                t.name().ok().and_then(|n| self.lookup(n)),
                Some(Definition::Number(_))
            ),
            _ => false,
        }
    }

    fn next_number(&mut self) -> Result<f64, ParseError> {
        let token = self.next()?;
        match token.kind {
            TokenKind::Number => token.value(),
            TokenKind::Variable => match self.lookup(token.name()?) {
                Some(Definition::Number(n)) => Ok(n),
                _ => Err(ParseError::syntax(
                    format!("'{}' is not defined as a number", token.name()?),
                    token.line,
                )),
            },
            _ => Err(ParseError::syntax("Expected a number", token.line)),
        }
    }

    fn next_f32(&mut self) -> Result<f32, ParseError> {
        self.next_number().map(|n| n as f32)
    }

    fn next_int(&mut self) -> Result<i64, ParseError> {
        self.next_number().map(|n| n.round() as i64)
    }

    fn next_unsigned(&mut self) -> Result<u64, ParseError> {
        let line = self.peek().map_or(self.last_line(), |t| t.line);
        let n = self.next_int()?;
        u64::try_from(n)
            .map_err(|_| ParseError::syntax("Expected a non-negative number", line))
    }

    fn next_rgba(&mut self) -> Result<Rgba, ParseError> {
        let token = self.next()?;
        match token.kind {
            TokenKind::Rgba => token.color(),
            TokenKind::Variable => match self.lookup(token.name()?) {
                Some(Definition::Color(c)) => Ok(c),
                _ => Err(ParseError::syntax(
                    format!("'{}' is not defined as a color", token.name()?),
                    token.line,
                )),
            },
            _ => Err(ParseError::syntax("Expected a color", token.line)),
        }
    }

    /// `[n n n]`, commas optional.
    fn next_vector<const N: usize>(&mut self) -> Result<[f64; N], ParseError> {
        self.expect(TokenKind::OpenBracket, "'['")?;
        let mut out = [0.0; N];
        for (i, v) in out.iter_mut().enumerate() {
            if i > 0 {
                self.eat(TokenKind::Comma);
            }
            *v = self.next_number()?;
        }
        self.expect(TokenKind::CloseBracket, "']'")?;
        Ok(out)
    }

    fn repetitions(count: f64, line: usize) -> Result<u32, ParseError> {
        let count = count.round();
        if count < 1.0 {
            return Err(ParseError::syntax("Loop count must be at least 1", line));
        }
        Ok(count.min(u32::MAX as f64) as u32)
    }

    // ─────────────────────────────────────────────────────
    // top level
    // ─────────────────────────────────────────────────────

    fn parse_set(&mut self) -> Result<(), ParseError> {
        self.expect(TokenKind::Set, "'set'")?;
        let key = self.next()?;
        match key.kind {
            TokenKind::Background => {
                let color = self.next_rgba()?;
                self.rules.settings.background = color;
            }
            TokenKind::Translation => {
                let v = self.next_vector::<3>()?;
                self.rules.settings.camera.translation = Some(v);
            }
            TokenKind::Rotation => {
                let v = self.next_vector::<9>()?;
                self.rules.settings.camera.rotation = Some(v);
            }
            TokenKind::Pivot => {
                let v = self.next_vector::<3>()?;
                self.rules.settings.camera.pivot = Some(v);
            }
            TokenKind::Scale => {
                let s = self.next_number()?;
                self.rules.settings.camera.scale = Some(s);
            }
            _ => {
                let setting = self.parse_setting(key)?;
                self.rules.settings.apply(&setting);
            }
        }
        Ok(())
    }

    /// The part of `set` that is also allowed inside a rule body.
    fn parse_setting(&mut self, key: &Token) -> Result<Setting, ParseError> {
        Ok(match key.kind {
            TokenKind::MaxDepth => {
                Setting::MaxDepth(self.next_unsigned()?.min(u32::MAX as u64) as u32)
            }
            TokenKind::MaxObjects => Setting::MaxObjects(self.next_unsigned()?),
            TokenKind::MinSize => Setting::MinSize(self.next_number()?),
            TokenKind::MaxSize => Setting::MaxSize(self.next_number()?),
            TokenKind::Seed if self.eat(TokenKind::Initial) => Setting::InitialSeed,
            TokenKind::Seed => Setting::Seed(self.next_int()?),
            TokenKind::ColorPool => Setting::ColorPool(self.parse_color_pool()?),
            _ => return Err(ParseError::syntax("Unexpected token after set", key.line)),
        })
    }

    fn parse_color_pool(&mut self) -> Result<ColorPool, ParseError> {
        let token = self.next()?;
        match token.kind {
            TokenKind::RandomHue => Ok(ColorPool::RandomHue),
            TokenKind::RandomRgb => Ok(ColorPool::RandomRgb),
            TokenKind::Greyscale => Ok(ColorPool::Greyscale),
            TokenKind::List => {
                self.eat(TokenKind::Colon);
                let mut colors = vec![self.next_rgba()?];
                while self.eat(TokenKind::Comma) {
                    colors.push(self.next_rgba()?);
                }
                Ok(ColorPool::List(colors))
            }
            _ => Err(ParseError::syntax("Unknown color pool", token.line)),
        }
    }

    fn parse_define(&mut self) -> Result<(), ParseError> {
        self.expect(TokenKind::Define, "'#define'")?;
        let name = self
            .expect(TokenKind::Variable, "a name after #define")?
            .name()?
            .to_string();
        let value = self.next()?;
        let definition = match value.kind {
            TokenKind::Number => Definition::Number(value.value()?),
            TokenKind::Rgba => Definition::Color(value.color()?),
            _ => {
                return Err(ParseError::syntax(
                    format!("Expected a number or color for '{name}'"),
                    value.line,
                ));
            }
        };
        self.defines.insert(name, definition);
        Ok(())
    }

    fn parse_rule(&mut self) -> Result<(), ParseError> {
        self.expect(TokenKind::Rule, "'rule'")?;
        let name = self
            .expect(TokenKind::Variable, "rule name")?
            .name()?
            .to_string();
        let mut rule = Rule {
            name: Some(name),
            ..Default::default()
        };

        loop {
            match self.peek_kind() {
                Some(TokenKind::Weight) => {
                    let line = self.next()?.line;
                    let weight = self.next_number()?;
                    if weight <= 0.0 || weight.is_nan() {
                        return Err(ParseError::syntax("Rule weight must be positive", line));
                    }
                    rule.weight = weight;
                }
                Some(TokenKind::MaxDepth) => {
                    self.pos += 1;
                    let max_depth = self.next_unsigned()?.min(u32::MAX as u64) as u32;
                    let next_rule = if self.eat(TokenKind::Greater) {
                        let target = self.expect(TokenKind::Variable, "rule name after '>'")?;
                        Some(target.name()?.to_string())
                    } else {
                        None
                    };
                    rule.depth_override = Some(DepthOverride {
                        max_depth,
                        next_rule,
                    });
                }
                _ => break,
            }
        }

        let open = self.expect(TokenKind::OpenBrace, "'{' after rule name")?;
        while !self.eat(TokenKind::CloseBrace) {
            if self.peek().is_none() {
                return Err(ParseError::syntax(
                    "Missing '}' at end of rule",
                    self.last_line(),
                ));
            }
            rule.actions.push(self.parse_action(true)?);
        }
        if rule.actions.is_empty() {
            return Err(ParseError::syntax("Expected rule body", open.line));
        }

        self.rules.add_rule(rule);
        Ok(())
    }

    /// Top-level actions up to the next directive form one anonymous rule.
    fn parse_initial_rule(&mut self) -> Result<(), ParseError> {
        let line = self.peek().map_or(self.last_line(), |t| t.line);
        let mut rule = Rule::default();
        while let Some(kind) = self.peek_kind() {
            if matches!(kind, TokenKind::Set | TokenKind::Rule | TokenKind::Define) {
                break;
            }
            rule.actions.push(self.parse_action(false)?);
        }
        if rule.actions.is_empty() {
            return Err(ParseError::syntax("Expected rule body", line));
        }
        self.rules.add_rule(rule);
        Ok(())
    }

    // ─────────────────────────────────────────────────────
    // actions
    // ─────────────────────────────────────────────────────

    fn parse_action(&mut self, allow_set: bool) -> Result<RuleAction, ParseError> {
        let mut loops = Vec::new();
        loop {
            let token = self.next()?;
            let line = token.line;

            if let Some(primitive) = token.kind.primitive() {
                return Ok(RuleAction {
                    loops,
                    kind: ActionKind::Draw(primitive),
                    line,
                });
            }

            match token.kind {
                TokenKind::Variable => {
                    let name = token.name()?;
                    match self.lookup(name) {
                        Some(Definition::Number(count)) if self.peek_kind() == Some(TokenKind::Mult) => {
                            self.pos += 1;
                            let repetitions = Self::repetitions(count, line)?;
                            let transformation = self.parse_transformation()?;
                            loops.push(TransformationLoop {
                                repetitions,
                                transformation,
                            });
                        }
                        _ => {
                            return Ok(RuleAction {
                                loops,
                                kind: ActionKind::Invoke(name.to_string()),
                                line,
                            });
                        }
                    }
                }
                TokenKind::Number => {
                    let repetitions = Self::repetitions(token.value()?, line)?;
                    self.expect(TokenKind::Mult, "'*' after loop count")?;
                    let transformation = self.parse_transformation()?;
                    loops.push(TransformationLoop {
                        repetitions,
                        transformation,
                    });
                }
                TokenKind::OpenBrace => {
                    self.pos -= 1;
                    let transformation = self.parse_transformation()?;
                    loops.push(TransformationLoop {
                        repetitions: 1,
                        transformation,
                    });
                }
                TokenKind::Set if allow_set => {
                    if !loops.is_empty() {
                        return Err(ParseError::syntax(
                            "Transformations cannot be applied to set",
                            line,
                        ));
                    }
                    let key = self.next()?;
                    let setting = self.parse_setting(key)?;
                    return Ok(RuleAction {
                        loops,
                        kind: ActionKind::Set(setting),
                        line,
                    });
                }
                other => {
                    return Err(ParseError::syntax(
                        format!("Unexpected {other:?} in rule body"),
                        line,
                    ));
                }
            }
        }
    }

    fn parse_transformation(&mut self) -> Result<Transformation, ParseError> {
        let open = self.expect(TokenKind::OpenBrace, "'{'")?;
        let mut t = Transformation::default();
        loop {
            let Some(token) = self.peek() else {
                return Err(ParseError::syntax(
                    "Unclosed transformation block",
                    open.line,
                ));
            };
            self.pos += 1;

            match token.kind {
                TokenKind::CloseBrace => return Ok(t),
                TokenKind::X => t.then(Mat4::from_translation(Vec3::X * self.next_f32()?)),
                TokenKind::Y => t.then(Mat4::from_translation(Vec3::Y * self.next_f32()?)),
                TokenKind::Z => t.then(Mat4::from_translation(Vec3::Z * self.next_f32()?)),
                TokenKind::Rx => t.then(Mat4::from_rotation_x(self.next_f32()?.to_radians())),
                TokenKind::Ry => t.then(Mat4::from_rotation_y(self.next_f32()?.to_radians())),
                TokenKind::Rz => t.then(Mat4::from_rotation_z(self.next_f32()?.to_radians())),
                TokenKind::S => {
                    let sx = self.next_f32()?;
                    let scale = if self.peek_number() {
                        let sy = self.next_f32()?;
                        let sz = self.next_f32()?;
                        Vec3::new(sx, sy, sz)
                    } else {
                        Vec3::splat(sx)
                    };
                    t.then(Mat4::from_scale(scale));
                }
                TokenKind::M => {
                    let mut v = [0.0f32; 9];
                    for x in v.iter_mut() {
                        *x = self.next_f32()?;
                    }
                    // each written row is the image of one axis
                    t.then(Mat4::from_mat3(Mat3::from_cols_array(&v)));
                }
                TokenKind::Fx => t.then(Mat4::from_scale(Vec3::new(-1.0, 1.0, 1.0))),
                TokenKind::Fy => t.then(Mat4::from_scale(Vec3::new(1.0, -1.0, 1.0))),
                TokenKind::Fz => t.then(Mat4::from_scale(Vec3::new(1.0, 1.0, -1.0))),
                TokenKind::Hue => t.hue += self.next_number()?,
                TokenKind::Sat => t.saturation *= self.next_number()?,
                TokenKind::Brightness => t.brightness *= self.next_number()?,
                TokenKind::Alpha => t.alpha *= self.next_number()?,
                TokenKind::Color => {
                    if self.eat(TokenKind::Random) {
                        t.random_color = true;
                    } else {
                        t.absolute = Some(self.next_rgba()?);
                    }
                }
                TokenKind::Blend => {
                    let color = self.next_rgba()?;
                    let strength = self.next_number()?;
                    t.blend = Some(Blend { color, strength });
                }
                other => {
                    return Err(ParseError::syntax(
                        format!("Unexpected {other:?} in transformation block"),
                        token.line,
                    ));
                }
            }
        }
    }
}
