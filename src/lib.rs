pub mod cli;
pub mod color;
pub mod model;
pub mod processor;
pub mod scene;
pub mod writer;

use std::fs::File;
use std::io::{self, BufWriter, Read};

use anyhow::Context;
use clap::Parser;
use tracing::info;

use crate::model::Rules;
use crate::writer::json::JsonLines;

pub use processor::{BuildStats, ParseError};
pub use scene::{Recorder, Scene};

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Lexical, syntax and semantic errors, in source order per pass.
    #[error("{}", join_lines(.0))]
    Parse(Vec<ParseError>),
    #[error("reading program: {0}")]
    Io(#[from] io::Error),
    /// A scene callback failed and the build stopped there.
    #[error(transparent)]
    Scene(#[from] anyhow::Error),
    /// Rule selection failed during expansion.
    #[error("{0}")]
    Rule(ParseError),
}

fn join_lines(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(ParseError::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Caller overrides applied on top of the program's own settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    pub seed: Option<i64>,
    /// Combined with `set maxobjects` by taking the smaller.
    pub max_objects: Option<u64>,
}

impl BuildOptions {
    fn apply(&self, rules: &mut Rules) {
        if let Some(seed) = self.seed {
            rules.settings.seed = Some(seed);
        }
        if let Some(max) = self.max_objects {
            let current = rules.settings.max_objects.unwrap_or(u64::MAX);
            rules.settings.max_objects = Some(current.min(max));
        }
    }
}

/// Compile `src` and expand it into `scene`. Nothing reaches the scene
/// unless the program compiles cleanly.
pub fn build<S: Scene>(src: &str, scene: S) -> Result<BuildStats, BuildError> {
    build_with(src, scene, BuildOptions::default())
}

pub fn build_with<S: Scene>(
    src: &str,
    scene: S,
    options: BuildOptions,
) -> Result<BuildStats, BuildError> {
    let mut rules = processor::compile(src).map_err(BuildError::Parse)?;
    options.apply(&mut rules);
    processor::Machine::new(&rules, scene).run()
}

/// Read the whole program first; expansion never touches the reader.
pub fn build_reader<R: Read, S: Scene>(
    mut reader: R,
    scene: S,
    options: BuildOptions,
) -> Result<BuildStats, BuildError> {
    let mut src = String::new();
    reader.read_to_string(&mut src)?;
    build_with(&src, scene, options)
}

pub fn run() -> anyhow::Result<()> {
    run_with(cli::Cli::parse())
}

pub fn run_with(args: cli::Cli) -> anyhow::Result<()> {
    // 1. ── Read ───────────────────────────────────────────────────────
    let src = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Reading {}", args.input.display()))?;

    // 2. ── Check only ─────────────────────────────────────────────────
    if args.check {
        let rules = processor::compile(&src)
            .map_err(BuildError::Parse)
            .with_context(|| format!("Checking {}", args.input.display()))?;
        info!(
            initial = rules.initial.len(),
            named = rules.rule_count(),
            "{} is valid",
            args.input.display()
        );
        return Ok(());
    }

    // 3. ── Expand into the output ─────────────────────────────────────
    let options = BuildOptions {
        seed: args.seed,
        max_objects: args.max_objects,
    };
    let (stats, events) = match &args.output {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("Creating {}", path.display()))?;
            let mut out = JsonLines::new(BufWriter::new(file));
            let stats = build_with(&src, &mut out, options)
                .with_context(|| format!("Building {}", args.input.display()))?;
            let events = out.written();
            out.into_inner()
                .with_context(|| format!("Writing {}", path.display()))?;
            (stats, events)
        }
        None => {
            let mut out = JsonLines::new(BufWriter::new(io::stdout().lock()));
            let stats = build_with(&src, &mut out, options)
                .with_context(|| format!("Building {}", args.input.display()))?;
            let events = out.written();
            out.into_inner().context("Writing stdout")?;
            (stats, events)
        }
    };

    info!(
        events,
        objects = stats.objects,
        steps = stats.steps,
        max_stack = stats.max_stack,
        pruned = stats.pruned,
        "scene written"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_tighten_budget() {
        let test_cases = vec![
            ("box", BuildOptions::default(), None),
            ("box", BuildOptions { seed: None, max_objects: Some(5) }, Some(5)),
            ("set maxobjects 3\nbox", BuildOptions { seed: None, max_objects: Some(5) }, Some(3)),
            ("set maxobjects 30\nbox", BuildOptions { seed: None, max_objects: Some(5) }, Some(5)),
        ];
        for (src, options, expected) in test_cases {
            let mut rules = processor::compile(src).unwrap();
            options.apply(&mut rules);
            assert_eq!(rules.settings.max_objects, expected, "{src}");
        }
    }

    #[test]
    fn test_seed_override() {
        let mut rules = processor::compile("set seed 3\nbox").unwrap();
        BuildOptions { seed: Some(-8), max_objects: None }.apply(&mut rules);
        assert_eq!(rules.seed(), -8);
    }

    #[test]
    fn test_parse_error_display_lists_every_error() {
        let mut recorder = Recorder::default();
        let err = build("box @\n$", &mut recorder).unwrap_err();
        assert_eq!(
            err.to_string(),
            "line 1: Variables must start with letters or underscores\n\
             line 2: Variables must start with letters or underscores"
        );
        assert!(recorder.events.is_empty());
    }
}
