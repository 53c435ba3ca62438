//! The option-arbitration engine (spec §4.2). Each role owns an ordered
//! catalog of `OptionDef`s; `run_options` drives the per-agent state
//! machine described in spec §4.2 exactly, with the `-1` "no active option"
//! sentinel represented idiomatically as `Option<usize>` rather than a
//! signed index (spec §3 invariant `activeOptionId ∈ [-1, catalog.len)`
//! becomes `None | Some(i) for i in 0..catalog.len()`).
//!
//! `can_start`/`should_terminate` must be pure, idempotent, and fast; `act`
//! is the only side-effecting method and is the sole source of the
//! returned `Action`. This mirrors the teacher's `Job` trait
//! (`describe`/`run_job` split between read-only and mutating phases),
//! generalized to the three-method contract the spec requires.

use crate::action::Action;

/// A policy unit, implemented either as a single behavior struct or composed
/// via the `derive_option!` helper below from one predicate.
pub trait OptionDef<Ctx> {
    fn name(&self) -> &'static str;
    fn can_start(&self, ctx: &Ctx) -> bool;
    fn should_terminate(&self, ctx: &Ctx) -> bool;
    fn act(&self, ctx: &mut Ctx) -> Action;
    fn interruptible(&self) -> bool;
}

/// Per-agent arbitration bookkeeping (the `active_option_id`/`tick count`
/// fields of spec §3's `AgentState`, factored out so any catalog/context
/// pair can share the same driver).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArbitrationState {
    pub active: Option<usize>,
    pub active_ticks: u32,
}

impl ArbitrationState {
    pub fn clear(&mut self) {
        self.active = None;
        self.active_ticks = 0;
    }
}

/// Drives one agent's arbitration for one tick against `catalog`, per
/// spec §4.2's preemption/continuation/fresh-scan state machine.
pub fn run_options<Ctx>(state: &mut ArbitrationState, catalog: &[Box<dyn OptionDef<Ctx>>], ctx: &mut Ctx) -> Action {
    if let Some(mut index) = state.active {
        if catalog[index].interruptible() {
            // Higher-priority options (lower index) always win; equal
            // priority keeps the incumbent, so the scan stops at the first hit.
            if let Some(preempt_index) = (0..index).find(|&j| catalog[j].can_start(ctx)) {
                index = preempt_index;
                state.active = Some(index);
                state.active_ticks = 0;
            }
        }
        state.active_ticks += 1;
        let action = catalog[index].act(ctx);
        if !action.is_noop() {
            if catalog[index].should_terminate(ctx) {
                state.clear();
            }
            return action;
        }
        // act() returned no-op: forcibly clear and fall through to a fresh
        // scan (spec §7 "option infinite loop guard").
        state.clear();
    }

    for (index, option) in catalog.iter().enumerate() {
        if !option.can_start(ctx) {
            continue;
        }
        state.active = Some(index);
        state.active_ticks = 1;
        let action = option.act(ctx);
        if !action.is_noop() {
            if option.should_terminate(ctx) {
                state.clear();
            }
            return action;
        }
        state.clear();
    }

    Action::NOOP
}

/// Builds an `OptionDef` from a single pure predicate plus an `act` closure,
/// deriving `can_start`/`should_terminate` as logical negations of each
/// other (spec §4.2: "a template/macro is provided to derive both from a
/// single predicate").
pub struct PredicateOption<Ctx> {
    name: &'static str,
    predicate: Box<dyn Fn(&Ctx) -> bool>,
    act_fn: Box<dyn Fn(&mut Ctx) -> Action>,
    interruptible: bool,
}

impl<Ctx> PredicateOption<Ctx> {
    pub fn new(
        name: &'static str,
        interruptible: bool,
        predicate: impl Fn(&Ctx) -> bool + 'static,
        act_fn: impl Fn(&mut Ctx) -> Action + 'static,
    ) -> Self {
        Self { name, predicate: Box::new(predicate), act_fn: Box::new(act_fn), interruptible }
    }
}

impl<Ctx> OptionDef<Ctx> for PredicateOption<Ctx> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn can_start(&self, ctx: &Ctx) -> bool {
        (self.predicate)(ctx)
    }

    fn should_terminate(&self, ctx: &Ctx) -> bool {
        !(self.predicate)(ctx)
    }

    fn act(&self, ctx: &mut Ctx) -> Action {
        (self.act_fn)(ctx)
    }

    fn interruptible(&self) -> bool {
        self.interruptible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Toggle {
        a_can_start: Cell<bool>,
    }

    struct FixedOption {
        name: &'static str,
        can_start: Box<dyn Fn(&Toggle) -> bool>,
        action: Action,
        interruptible: bool,
    }

    impl OptionDef<Toggle> for FixedOption {
        fn name(&self) -> &'static str {
            self.name
        }
        fn can_start(&self, ctx: &Toggle) -> bool {
            (self.can_start)(ctx)
        }
        fn should_terminate(&self, ctx: &Toggle) -> bool {
            !self.can_start(ctx)
        }
        fn act(&self, _ctx: &mut Toggle) -> Action {
            self.action
        }
        fn interruptible(&self) -> bool {
            self.interruptible
        }
    }

    fn catalog() -> Vec<Box<dyn OptionDef<Toggle>>> {
        vec![
            Box::new(FixedOption {
                name: "A",
                can_start: Box::new(|ctx| ctx.a_can_start.get()),
                action: Action::new(crate::action::Verb::Move, 7),
                interruptible: true,
            }),
            Box::new(FixedOption {
                name: "B",
                can_start: Box::new(|_| true),
                action: Action::new(crate::action::Verb::Move, 5),
                interruptible: true,
            }),
        ]
    }

    #[test]
    fn s1_option_preemption() {
        let catalog = catalog();
        let mut ctx = Toggle { a_can_start: Cell::new(false) };
        let mut state = ArbitrationState::default();

        let first = run_options(&mut state, &catalog, &mut ctx);
        assert_eq!(first.arg, 5);
        assert_eq!(state.active, Some(1));

        ctx.a_can_start.set(true);
        let second = run_options(&mut state, &catalog, &mut ctx);
        assert_eq!(second.arg, 7, "A should preempt B once A.can_start flips true");
        assert_eq!(state.active, Some(0));
        assert_eq!(state.active_ticks, 1);
    }

    #[test]
    fn lower_priority_option_never_preempts_the_incumbent() {
        // Incumbent is index 0 (highest priority); index 1 becoming startable
        // must never preempt it, since preemption only scans strictly
        // higher-priority (lower-index) options.
        let catalog: Vec<Box<dyn OptionDef<()>>> = vec![
            Box::new(PredicateOption::new("first", true, |_: &()| true, |_| Action::new(crate::action::Verb::Move, 1))),
            Box::new(PredicateOption::new("second", true, |_: &()| true, |_| Action::new(crate::action::Verb::Move, 2))),
        ];
        let mut state = ArbitrationState::default();
        let mut ctx = ();
        let first = run_options(&mut state, &catalog, &mut ctx);
        assert_eq!(first.arg, 1);
        assert_eq!(state.active, Some(0));
        let second = run_options(&mut state, &catalog, &mut ctx);
        assert_eq!(second.arg, 1, "index 0 keeps running even though index 1 is also startable");
    }

    #[test]
    fn noop_act_clears_active_and_falls_through() {
        let catalog: Vec<Box<dyn OptionDef<()>>> = vec![
            Box::new(PredicateOption::new("noop_forever", false, |_: &()| true, |_| Action::NOOP)),
            Box::new(PredicateOption::new("fallback", false, |_: &()| true, |_| Action::new(crate::action::Verb::Move, 3))),
        ];
        let mut state = ArbitrationState::default();
        let mut ctx = ();
        let action = run_options(&mut state, &catalog, &mut ctx);
        assert_eq!(action.arg, 3, "an option that can't act must fall through to the next candidate, not loop forever");
    }
}
