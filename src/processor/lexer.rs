//! Hand-written scanner for EisenScript.
//!
//! The whole source is scanned up front into a `Scan`: the token list, one
//! `CharClass` per character (for highlighting) and every lexical error.
//! A lexical error throws away the rest of its line and scanning resumes
//! on the next one, so a single pass reports every bad line.
//
//  Lexical items:
//
//      Number   ::= '-'? [0-9]* ('.' [0-9]*)?       (at least one digit)
//      Rgba     ::= '#' hex{3,4,6,8,9,12} | <named color>
//      Keyword  ::= <entry in KEYWORDS> not followed by [A-Za-z0-9_]
//      Variable ::= [A-Za-z_][A-Za-z0-9_]*
//      Comments ::= '//' to end of line | '/*' … '*/' (may span lines)

use tracing::{debug, warn};

use super::error::ParseError;
use super::token::{KEYWORDS, Token};
use super::trie::Step;
use crate::color::{Rgba, named};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Whitespace,
    Comment,
    Number,
    Color,
    Keyword,
    Variable,
    Error,
}

#[derive(Debug, Clone, Default)]
pub struct Scan {
    pub tokens: Vec<Token>,
    /// Parallel to the canonical text: every line ends in exactly one `\n`.
    pub classes: Vec<CharClass>,
    pub errors: Vec<ParseError>,
}

pub fn scan(src: &str) -> Scan {
    Lexer::new(src).scan()
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

pub struct Lexer {
    text: Vec<char>,
    pos: usize,
    line: usize,
    in_comment: bool,
    out: Scan,
}

impl Lexer {
    pub fn new(src: &str) -> Self {
        let mut text = Vec::with_capacity(src.len() + 1);
        for line in src.lines() {
            text.extend(line.chars());
            text.push('\n');
        }
        Self {
            text,
            pos: 0,
            line: 1,
            in_comment: false,
            out: Scan::default(),
        }
    }

    pub fn scan(mut self) -> Scan {
        while self.pos < self.text.len() {
            if let Err(err) = self.scan_line() {
                warn!("{err}");
                self.out.errors.push(err);
                while !self.at_line_end() {
                    self.advance(CharClass::Error);
                }
            }
            if self.pos < self.text.len() {
                // the '\n'
                self.advance(CharClass::Whitespace);
            }
            self.line += 1;
        }

        debug!(
            tokens = self.out.tokens.len(),
            errors = self.out.errors.len(),
            "scanned source"
        );
        self.out
    }

    fn scan_line(&mut self) -> Result<(), ParseError> {
        loop {
            if self.in_comment && !self.skip_block_comment() {
                return Ok(());
            }

            while self.cur().is_some_and(|c| c != '\n' && c.is_whitespace()) {
                self.advance(CharClass::Whitespace);
            }
            if self.at_line_end() {
                return Ok(());
            }

            match (self.cur(), self.peek(1)) {
                (Some('/'), Some('/')) => {
                    while !self.at_line_end() {
                        self.advance(CharClass::Comment);
                    }
                    return Ok(());
                }
                (Some('/'), Some('*')) => {
                    self.advance_to(self.pos + 2, CharClass::Comment);
                    self.in_comment = true;
                    continue;
                }
                _ => {}
            }

            if self.starts_number() {
                self.read_number();
                continue;
            }
            if self.read_color()? {
                continue;
            }
            self.read_word()?;
        }
    }

    // ─────────────────────────────────────────────────────
    // cursor helpers
    // ─────────────────────────────────────────────────────

    fn cur(&self) -> Option<char> {
        self.peek(0)
    }

    fn peek(&self, n: usize) -> Option<char> {
        self.text.get(self.pos + n).copied()
    }

    fn at_line_end(&self) -> bool {
        matches!(self.cur(), None | Some('\n'))
    }

    fn advance(&mut self, class: CharClass) {
        self.out.classes.push(class);
        self.pos += 1;
    }

    fn advance_to(&mut self, end: usize, class: CharClass) {
        let count = end.saturating_sub(self.pos);
        self.out.classes.extend(std::iter::repeat_n(class, count));
        self.pos = end;
    }

    fn ident_end(&self, start: usize) -> usize {
        let mut end = start;
        while self.text.get(end).copied().is_some_and(is_ident_char) {
            end += 1;
        }
        end
    }

    /// Returns `true` once the closing `*/` is consumed, `false` at end of line.
    fn skip_block_comment(&mut self) -> bool {
        while !self.at_line_end() {
            if self.cur() == Some('*') && self.peek(1) == Some('/') {
                self.advance_to(self.pos + 2, CharClass::Comment);
                self.in_comment = false;
                return true;
            }
            self.advance(CharClass::Comment);
        }
        false
    }

    // ─────────────────────────────────────────────────────
    // numbers
    // ─────────────────────────────────────────────────────

    fn starts_number(&self) -> bool {
        let digit = |n: usize| self.peek(n).is_some_and(|c| c.is_ascii_digit());
        match self.cur() {
            Some(c) if c.is_ascii_digit() => true,
            Some('.') => digit(1),
            Some('-') => digit(1) || (self.peek(1) == Some('.') && digit(2)),
            _ => false,
        }
    }

    /// Accumulated digit by digit; no locale-dependent parsing.
    fn read_number(&mut self) {
        let mut sign = 1.0;
        if self.cur() == Some('-') {
            sign = -1.0;
            self.advance(CharClass::Number);
        }

        let mut int = 0.0;
        while let Some(d) = self.cur().and_then(|c| c.to_digit(10)) {
            int = int * 10.0 + d as f64;
            self.advance(CharClass::Number);
        }

        let mut frac = 0.0;
        if self.cur() == Some('.') {
            self.advance(CharClass::Number);
            let mut place = 0.1;
            while let Some(d) = self.cur().and_then(|c| c.to_digit(10)) {
                frac += d as f64 * place;
                place /= 10.0;
                self.advance(CharClass::Number);
            }
        }

        self.out
            .tokens
            .push(Token::number(sign * (int + frac), self.line));
    }

    // ─────────────────────────────────────────────────────
    // colors
    // ─────────────────────────────────────────────────────

    fn read_color(&mut self) -> Result<bool, ParseError> {
        match self.cur() {
            Some('#') => {
                let end = self.ident_end(self.pos + 1);
                let word: String = self.text[self.pos + 1..end].iter().collect();
                if word == "define" {
                    return Ok(false);
                }

                let mut hex_end = self.pos + 1;
                while self.text.get(hex_end).is_some_and(|c| c.is_ascii_hexdigit()) {
                    hex_end += 1;
                }
                let digits: String = self.text[self.pos + 1..hex_end].iter().collect();
                let rgba = Rgba::from_hex(&digits)
                    .ok_or_else(|| ParseError::lexical("Invalid color format", self.line))?;

                self.advance_to(hex_end, CharClass::Color);
                self.out.tokens.push(Token::rgba(rgba, self.line));
                Ok(true)
            }
            Some(c) if c.is_alphabetic() => {
                let end = self.ident_end(self.pos);
                let word: String = self.text[self.pos..end].iter().collect();
                match named::lookup(&word) {
                    Some(rgba) => {
                        self.advance_to(end, CharClass::Color);
                        self.out.tokens.push(Token::rgba(rgba, self.line));
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
            _ => Ok(false),
        }
    }

    // ─────────────────────────────────────────────────────
    // keywords / variables
    // ─────────────────────────────────────────────────────

    fn read_word(&mut self) -> Result<(), ParseError> {
        let Some(first) = self.cur() else {
            return Ok(());
        };
        let alphabetic = first.is_alphabetic();

        // Longest keyword that is not the prefix of a longer identifier.
        let mut cursor = KEYWORDS.cursor();
        let mut end = self.pos;
        while let Some(ch) = self.text.get(end).copied() {
            match cursor.step(ch) {
                Step::Dead => break,
                Step::Prefix => end += 1,
                Step::Match(kind) => {
                    end += 1;
                    let continues = self.text.get(end).copied().is_some_and(is_ident_char);
                    if !alphabetic || !continues {
                        self.advance_to(end, CharClass::Keyword);
                        self.out.tokens.push(Token::keyword(kind, self.line));
                        return Ok(());
                    }
                }
            }
        }

        if !alphabetic && first != '_' {
            return Err(ParseError::lexical(
                "Variables must start with letters or underscores",
                self.line,
            ));
        }

        let end = self.ident_end(self.pos);
        let name: String = self.text[self.pos..end].iter().collect();
        self.advance_to(end, CharClass::Variable);
        self.out.tokens.push(Token::variable(name, self.line));
        Ok(())
    }
}
