//! Stack machine that expands a finalized `Rules` into scene events.
//!
//! Recursion in the grammar never becomes recursion in Rust: every pending
//! rule invocation is a `Frame` on an explicit stack, so the depth budget is
//! a plain comparison against the stack height.
//!
//! A frame positioned on an action with transformation loops keeps one
//! accumulated (matrix, color) per loop plus an iteration counter per loop.
//! They are computed as soon as the frame moves onto that action, before any
//! child pushed by the previous action runs.
//! The counters advance like an odometer, innermost first, and only the
//! suffix of accumulated states behind the digit that moved is recomputed.
//! The resulting order is row-major: the first-declared loop varies slowest.

use glam::Mat4;
use serde::Serialize;
use tracing::{debug, trace};

use crate::BuildError;
use crate::color::{ColorPool, Rgba};
use crate::model::{ActionKind, RngStreams, Rule, RuleAction, Rules, Setting, Settings, Transformation};
use crate::scene::{DrawEvent, Scene};

/// Counters from one expansion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    /// Draw events emitted.
    pub objects: u64,
    pub steps: u64,
    /// Highest stack height reached.
    pub max_stack: usize,
    /// Invocations dropped at the depth limit.
    pub pruned: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct State {
    matrix: Mat4,
    color: Rgba,
}

impl State {
    fn apply<R: rand::Rng + ?Sized>(
        self,
        t: &Transformation,
        pool: &ColorPool,
        rng: &mut R,
    ) -> State {
        let (matrix, color) = t.apply(self.matrix, self.color, pool, rng);
        State { matrix, color }
    }
}

#[derive(Debug)]
struct Frame<'r> {
    rule: &'r Rule,
    action: usize,
    input: State,
    acc: Vec<State>,
    /// Iteration per loop of `action`, parallel to `acc`.
    counters: Vec<u32>,
}

pub struct Machine<'r, S> {
    rules: &'r Rules,
    scene: S,
    /// Live copy; set actions in rule bodies write here.
    settings: Settings,
    streams: RngStreams,
    initial_seed: i64,
    /// Slots above `depth` are kept for reuse.
    frames: Vec<Frame<'r>>,
    depth: usize,
    stats: BuildStats,
}

impl<'r, S: Scene> Machine<'r, S> {
    pub fn new(rules: &'r Rules, scene: S) -> Self {
        Self {
            rules,
            scene,
            settings: rules.settings.clone(),
            streams: rules.streams(),
            initial_seed: rules.seed(),
            frames: Vec::new(),
            depth: 0,
            stats: BuildStats::default(),
        }
    }

    /// Background, camera, then every initial rule in declaration order
    /// until the object budget is spent.
    pub fn run(mut self) -> Result<BuildStats, BuildError> {
        debug!(
            seed = self.initial_seed,
            max_depth = self.settings.max_depth,
            max_objects = ?self.settings.max_objects,
            "expanding"
        );

        self.scene.background(self.settings.background)?;
        self.scene.camera(&self.settings.camera)?;

        let rules = self.rules;
        for rule in &rules.initial {
            if self.budget_spent() {
                break;
            }
            self.push(
                rule,
                State {
                    matrix: Mat4::IDENTITY,
                    color: Rgba::RED,
                },
            );
            self.drain()?;
        }

        debug!(
            objects = self.stats.objects,
            steps = self.stats.steps,
            max_stack = self.stats.max_stack,
            pruned = self.stats.pruned,
            "expansion finished"
        );
        Ok(self.stats)
    }

    fn budget_spent(&self) -> bool {
        self.settings
            .max_objects
            .is_some_and(|max| self.stats.objects >= max)
    }

    fn at_depth_limit(&self) -> bool {
        self.depth >= (self.settings.max_depth as usize).saturating_sub(1)
    }

    fn push(&mut self, rule: &'r Rule, input: State) {
        match self.frames.get_mut(self.depth) {
            Some(frame) => {
                frame.rule = rule;
                frame.action = 0;
                frame.input = input;
            }
            None => self.frames.push(Frame {
                rule,
                action: 0,
                input,
                acc: Vec::new(),
                counters: Vec::new(),
            }),
        }
        self.depth += 1;
        self.stats.max_stack = self.stats.max_stack.max(self.depth);
        self.enter_action(self.depth - 1, 0);
    }

    fn drain(&mut self) -> Result<(), BuildError> {
        while self.depth > 0 {
            if self.budget_spent() {
                self.depth = 0;
                break;
            }
            self.stats.steps += 1;
            self.step()?;
        }
        Ok(())
    }

    fn step(&mut self) -> Result<(), BuildError> {
        let top = self.depth - 1;
        let rule = self.frames[top].rule;
        let index = self.frames[top].action;

        let Some(action) = rule.actions.get(index) else {
            self.depth -= 1;
            return Ok(());
        };

        trace!(
            rule = rule.display_name(),
            action = index,
            depth = self.depth,
            counters = ?self.frames[top].counters,
            "step"
        );

        if action.loops.is_empty() {
            let input = self.frames[top].input;
            self.perform(action, input)?;
            self.enter_action(top, index + 1);
            return Ok(());
        }

        if matches!(action.kind, ActionKind::Invoke(_)) && self.at_depth_limit() {
            // the whole cross-product goes
            self.stats.pruned += 1;
            self.enter_action(top, index + 1);
            return Ok(());
        }

        let Some(&state) = self.frames[top].acc.last() else {
            self.enter_action(top, index + 1);
            return Ok(());
        };
        self.perform(action, state)?;
        if self.advance(top, action) {
            self.enter_action(top, index + 1);
        }
        Ok(())
    }

    /// Position the frame at `top` on `index`, priming its loops if it has
    /// any. Runs after the previous action's child was pushed and before that
    /// child takes its first step.
    fn enter_action(&mut self, top: usize, index: usize) {
        let frame = &mut self.frames[top];
        frame.action = index;
        let rule = frame.rule;
        if let Some(action) = rule.actions.get(index) {
            if !action.loops.is_empty() {
                self.prime(top, action);
            }
        }
    }

    /// `acc[i]` = loop `i` applied once to `acc[i - 1]`, with the frame
    /// input standing in for `acc[-1]`.
    fn prime(&mut self, top: usize, action: &'r RuleAction) {
        let frame = &mut self.frames[top];
        frame.acc.clear();
        frame.counters.clear();

        let mut state = frame.input;
        for l in &action.loops {
            state = state.apply(
                &l.transformation,
                &self.settings.color_pool,
                &mut self.streams.color,
            );
            frame.acc.push(state);
            frame.counters.push(0);
        }
    }

    /// Move to the next loop combination. Returns `true` once every
    /// combination has been produced.
    fn advance(&mut self, top: usize, action: &RuleAction) -> bool {
        let frame = &mut self.frames[top];
        let loops = &action.loops;

        for dim in (0..loops.len()).rev() {
            frame.counters[dim] += 1;
            if frame.counters[dim] < loops[dim].repetitions {
                let mut state = frame.acc[dim];
                for (i, l) in loops.iter().enumerate().skip(dim) {
                    // the moved digit steps from its own previous value,
                    // the digits after it restart from their predecessor
                    state = state.apply(
                        &l.transformation,
                        &self.settings.color_pool,
                        &mut self.streams.color,
                    );
                    frame.acc[i] = state;
                }
                return false;
            }
            frame.counters[dim] = 0;
        }
        true
    }

    fn perform(&mut self, action: &'r RuleAction, state: State) -> Result<(), BuildError> {
        match &action.kind {
            ActionKind::Draw(primitive) => {
                trace!(primitive = %primitive, objects = self.stats.objects, "draw");
                self.scene.draw(&DrawEvent {
                    primitive: *primitive,
                    matrix: state.matrix,
                    color: state.color,
                })?;
                self.stats.objects += 1;
            }
            ActionKind::Invoke(name) => {
                if self.at_depth_limit() {
                    self.stats.pruned += 1;
                    return Ok(());
                }
                let rules = self.rules;
                let rule = rules
                    .pick(name, &mut self.streams.geometry, Some(action.line))
                    .map_err(BuildError::Rule)?;
                self.push(rule, state);
            }
            ActionKind::Set(setting) => self.apply_setting(setting),
        }
        Ok(())
    }

    fn apply_setting(&mut self, setting: &Setting) {
        match setting {
            Setting::Seed(seed) => self.streams = RngStreams::from_seed(*seed),
            Setting::InitialSeed => self.streams = RngStreams::from_seed(self.initial_seed),
            _ => {}
        }
        debug!(?setting, "setting changed during expansion");
        self.settings.apply(setting);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Primitive;
    use crate::processor::{compile, lexer, script_parser::Parser};
    use crate::scene::{Recorder, SceneEvent};
    use glam::Vec3;

    fn expand(src: &str) -> (Recorder, BuildStats) {
        let rules = compile(src).unwrap_or_else(|e| panic!("{src}: {e:?}"));
        let mut recorder = Recorder::default();
        let stats = Machine::new(&rules, &mut recorder).run().unwrap();
        (recorder, stats)
    }

    fn translations(recorder: &Recorder) -> Vec<Vec3> {
        recorder
            .draws()
            .map(|d| d.matrix.w_axis.truncate())
            .collect()
    }

    #[test]
    fn test_single_box() {
        let (recorder, stats) = expand("box");
        assert_eq!(
            recorder.events,
            vec![
                SceneEvent::Background { color: Rgba::WHITE },
                SceneEvent::Camera(Default::default()),
                SceneEvent::Draw(DrawEvent {
                    primitive: Primitive::Box,
                    matrix: Mat4::IDENTITY,
                    color: Rgba::RED,
                }),
            ]
        );
        assert_eq!(stats.objects, 1);
        assert_eq!(stats.max_stack, 1);
    }

    #[test]
    fn test_odometer_three_dimensions() {
        let (recorder, _) = expand("2 * { x 1 } 3 * { y 1 } 2 * { z 1 } box");
        let mut expected = Vec::new();
        for x in 1..=2 {
            for y in 1..=3 {
                for z in 1..=2 {
                    expected.push(Vec3::new(x as f32, y as f32, z as f32));
                }
            }
        }
        assert_eq!(translations(&recorder), expected);
    }

    #[test]
    fn test_loop_transform_stacks_on_input() {
        let (recorder, _) = expand("{ x 10 } r\nrule r { 2 * { x 1 } box }");
        assert_eq!(
            translations(&recorder),
            vec![Vec3::new(11.0, 0.0, 0.0), Vec3::new(12.0, 0.0, 0.0)]
        );
    }

    #[test]
    fn test_depth_limit_prunes_silently() {
        let test_cases = vec![
            // initial frame is depth 1; invocations stop at depth max - 1
            ("set maxdepth 3\nr\nrule r { box { x 1 } r }", 1, 1),
            ("set maxdepth 6\nr\nrule r { box { x 1 } r }", 4, 1),
            ("set maxdepth 2\n3 * { x 1 } r\nrule r { box }", 0, 1),
            ("set maxdepth 1\nbox r\nrule r { box }", 1, 1),
        ];
        for (src, objects, pruned) in test_cases {
            let (_, stats) = expand(src);
            assert_eq!(stats.objects, objects, "{src}");
            assert_eq!(stats.pruned, pruned, "{src}");
        }
    }

    #[test]
    fn test_object_budget_is_exact() {
        let test_cases = vec![
            ("set maxobjects 4\n100 * { x 1 } box", 4),
            ("set maxobjects 7\nr\nrule r { box { x 1 } r }", 7),
            ("set maxobjects 2\nbox\nbox\nbox", 2),
            ("set maxobjects 0\nbox", 0),
        ];
        for (src, objects) in test_cases {
            let (recorder, stats) = expand(src);
            assert_eq!(stats.objects, objects, "{src}");
            assert_eq!(recorder.draws().count() as u64, objects, "{src}");
        }
    }

    #[test]
    fn test_set_actions_change_live_settings() {
        let (recorder, _) = expand("r\nrule r { set colorpool list:#010203 { color random } box }");
        let colors: Vec<Rgba> = recorder.draws().map(|d| d.color).collect();
        assert_eq!(colors, vec![Rgba::rgb(1, 2, 3)]);

        let (_, stats) = expand("r\nrule r { set maxobjects 3 box { x 1 } r }");
        assert_eq!(stats.objects, 3);
    }

    #[test]
    fn test_seed_initial_replays_color_stream() {
        let (recorder, _) = expand(
            "set seed 9\nr\nrule r { { color random } box set seed 4 set seed initial { color random } box }",
        );
        let colors: Vec<Rgba> = recorder.draws().map(|d| d.color).collect();
        assert_eq!(colors.len(), 2);
        assert_eq!(colors[0], colors[1]);
    }

    #[test]
    fn test_next_loop_primed_before_child_runs() {
        // the child's looped sphere is its second action, so the parent's
        // looped box reaches the colour stream first
        let (recorder, _) = expand(
            "r\nrule r { child { color random } box }\nrule child { box { color random } sphere }",
        );
        let mut streams = RngStreams::from_seed(0);
        let first = ColorPool::RandomRgb.draw(&mut streams.color);
        let second = ColorPool::RandomRgb.draw(&mut streams.color);
        assert_ne!(first, second);

        let draws: Vec<(Primitive, Rgba)> = recorder.draws().map(|d| (d.primitive, d.color)).collect();
        assert_eq!(
            draws,
            vec![
                (Primitive::Box, Rgba::RED),
                (Primitive::Sphere, second),
                (Primitive::Box, first),
            ]
        );
    }

    #[test]
    fn test_weighted_choice_follows_seed() {
        let src = "set seed 5\n20 * { x 1 } r\nrule r w 1 { box }\nrule r w 1 { sphere }";
        let (a, _) = expand(src);
        let (b, _) = expand(src);
        assert_eq!(a.events, b.events);

        let kinds: Vec<Primitive> = a.draws().map(|d| d.primitive).collect();
        assert!(kinds.contains(&Primitive::Box));
        assert!(kinds.contains(&Primitive::Sphere));
    }

    #[test]
    fn test_undefined_rule_at_runtime() {
        // bypasses validation on purpose
        let scan = lexer::scan("box\nmissing");
        let (rules, err) = Parser::new(&scan.tokens).parse();
        assert_eq!(err, None);

        let mut recorder = Recorder::default();
        match Machine::new(&rules, &mut recorder).run() {
            Err(BuildError::Rule(e)) => {
                assert_eq!(e.line, Some(2));
                assert!(e.message.contains("missing"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(recorder.draws().count(), 1);
    }

    struct FailOnSecond {
        draws: usize,
    }

    impl Scene for FailOnSecond {
        fn draw(&mut self, _event: &DrawEvent) -> anyhow::Result<()> {
            self.draws += 1;
            if self.draws == 2 {
                anyhow::bail!("renderer full");
            }
            Ok(())
        }
    }

    #[test]
    fn test_scene_failure_aborts() {
        let rules = compile("10 * { x 1 } box").unwrap();
        let mut scene = FailOnSecond { draws: 0 };
        let err = Machine::new(&rules, &mut scene).run().unwrap_err();
        assert!(matches!(err, BuildError::Scene(_)));
        assert_eq!(err.to_string(), "renderer full");
        assert_eq!(scene.draws, 2);
    }
}
