//! In-memory grammar: what the parser builds and the interpreter walks.
//!
//! A `Rules` value is built once per parse, finalized (weights normalized),
//! and only read from afterwards.
pub mod transform;
pub mod weighted;

pub use transform::{Blend, Transformation};
pub use weighted::WeightedRule;

use std::collections::HashMap;
use std::fmt;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde::Serialize;

use crate::color::{ColorPool, Rgba};
use crate::processor::error::ParseError;

/// Seed used when the program never says `set seed`.
pub const DEFAULT_SEED: i64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    Box,
    Grid,
    Sphere,
    Line,
    Point,
    Triangle,
    Mesh,
    Cylinder,
    Tube,
}

impl Primitive {
    pub fn as_str(self) -> &'static str {
        match self {
            Primitive::Box => "box",
            Primitive::Grid => "grid",
            Primitive::Sphere => "sphere",
            Primitive::Line => "line",
            Primitive::Point => "point",
            Primitive::Triangle => "triangle",
            Primitive::Mesh => "mesh",
            Primitive::Cylinder => "cylinder",
            Primitive::Tube => "tube",
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `N * { ... }` – one dimension of a nested iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformationLoop {
    pub repetitions: u32,
    pub transformation: Transformation,
}

/// `set ...` inside a rule body.
#[derive(Debug, Clone, PartialEq)]
pub enum Setting {
    MaxDepth(u32),
    MaxObjects(u64),
    MinSize(f64),
    MaxSize(f64),
    Seed(i64),
    /// `set seed initial` – go back to the program's starting seed.
    InitialSeed,
    ColorPool(ColorPool),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionKind {
    Draw(Primitive),
    Invoke(String),
    Set(Setting),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleAction {
    /// Enumerated outermost-first before the effect fires; empty for a
    /// plain action.
    pub loops: Vec<TransformationLoop>,
    pub kind: ActionKind,
    pub line: usize,
}

/// `md N [> next]` on a rule header. Stored, not yet used by the interpreter.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthOverride {
    pub max_depth: u32,
    pub next_rule: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    /// `None` for the anonymous top-level rules.
    pub name: Option<String>,
    /// Relative to siblings sharing the name.
    pub weight: f64,
    pub depth_override: Option<DepthOverride>,
    pub actions: Vec<RuleAction>,
}

impl Default for Rule {
    fn default() -> Self {
        Self {
            name: None,
            weight: 1.0,
            depth_override: None,
            actions: Vec::new(),
        }
    }
}

impl Rule {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<initial>")
    }
}

/// Camera parameters, passed through to the renderer untouched.
/// `None` means "renderer default".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CameraInfo {
    pub translation: Option<[f64; 3]>,
    pub rotation: Option<[f64; 9]>,
    pub pivot: Option<[f64; 3]>,
    pub scale: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub max_depth: u32,
    /// `None` is unbounded.
    pub max_objects: Option<u64>,
    pub min_size: f64,
    pub max_size: f64,
    pub seed: Option<i64>,
    pub background: Rgba,
    pub camera: CameraInfo,
    pub color_pool: ColorPool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_depth: 1000,
            max_objects: None,
            min_size: f64::MAX,
            max_size: f64::MIN,
            seed: None,
            background: Rgba::WHITE,
            camera: CameraInfo::default(),
            color_pool: ColorPool::default(),
        }
    }
}

impl Settings {
    /// `set seed initial` is left to the interpreter, which owns the streams.
    pub fn apply(&mut self, setting: &Setting) {
        match setting {
            Setting::MaxDepth(depth) => self.max_depth = *depth,
            Setting::MaxObjects(count) => self.max_objects = Some(*count),
            Setting::MinSize(size) => self.min_size = *size,
            Setting::MaxSize(size) => self.max_size = *size,
            Setting::Seed(seed) => self.seed = Some(*seed),
            Setting::InitialSeed => {}
            Setting::ColorPool(pool) => self.color_pool = pool.clone(),
        }
    }
}

/// Two independent random streams: rule selection never perturbs color
/// draws and vice versa.
#[derive(Debug, Clone)]
pub struct RngStreams {
    pub geometry: Pcg64,
    pub color: Pcg64,
}

impl RngStreams {
    pub fn from_seed(seed: i64) -> Self {
        Self {
            geometry: Pcg64::seed_from_u64(seed as u64),
            color: Pcg64::seed_from_u64(seed.wrapping_add(1) as u64),
        }
    }
}

/// A whole program.
#[derive(Debug, Clone, Default)]
pub struct Rules {
    pub settings: Settings,
    /// Anonymous rules, run in declaration order.
    pub initial: Vec<Rule>,
    groups: HashMap<String, WeightedRule>,
}

impl Rules {
    pub fn add_rule(&mut self, rule: Rule) {
        match &rule.name {
            Some(name) => self.groups.entry(name.clone()).or_default().add(rule),
            None => self.initial.push(rule),
        }
    }

    /// Number of named variants across all groups.
    pub fn rule_count(&self) -> usize {
        self.groups.values().map(WeightedRule::len).sum()
    }

    pub fn group(&self, name: &str) -> Option<&WeightedRule> {
        self.groups.get(name)
    }

    pub fn seed(&self) -> i64 {
        self.settings.seed.unwrap_or(DEFAULT_SEED)
    }

    pub fn streams(&self) -> RngStreams {
        RngStreams::from_seed(self.seed())
    }

    /// Choose one variant of `name`. `line` is the calling line when known.
    pub fn pick<R: Rng + ?Sized>(
        &self,
        name: &str,
        rng: &mut R,
        line: Option<usize>,
    ) -> Result<&Rule, ParseError> {
        self.groups
            .get(name)
            .and_then(|group| group.pick(rng))
            .ok_or_else(|| ParseError::undefined_rule(name, line))
    }

    /// One error per invocation of a rule name with no variants.
    pub fn validate(&self) -> Vec<ParseError> {
        let named = self.groups.values().flat_map(|g| g.variants().iter());
        self.initial
            .iter()
            .chain(named)
            .flat_map(|rule| rule.actions.iter())
            .filter_map(|action| match &action.kind {
                ActionKind::Invoke(target)
                    if self.group(target).is_none_or(WeightedRule::is_empty) =>
                {
                    Some(ParseError::undefined_rule(target, None))
                }
                _ => None,
            })
            .collect()
    }

    /// Normalize every group's weights so selection is read-only from here on.
    pub fn finalize(&mut self) {
        for group in self.groups.values_mut() {
            group.normalize();
        }
    }
}
