//! Property-based tests for the bot creation dialogue.
//!
//! The machine is pure, so these drive it with arbitrary input sequences
//! and check the structural invariants: steps only advance in their fixed
//! order or reset, cancellation always lands in idle, and a completed
//! draft is always fully populated and unique by name.

use botforge_desktop::flow::{FlowMachine, FlowSignal, FlowStep};
use proptest::prelude::*;

// =============================================================================
// Helper Functions
// =============================================================================

/// Position of a step in the dialogue order.
fn step_index(step: &FlowStep) -> usize {
    match step {
        FlowStep::Idle => 0,
        FlowStep::Name { .. } => 1,
        FlowStep::PurposeCategory { .. } => 2,
        FlowStep::PurposeDescription { .. } => 3,
        FlowStep::Style { .. } => 4,
        FlowStep::Emoji { .. } => 5,
        FlowStep::Summary { .. } => 6,
    }
}

/// Inputs that bias the walk toward interesting transitions while still
/// mixing in arbitrary text.
fn input_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("/create".to_string()),
        Just("cancel".to_string()),
        Just("more".to_string()),
        Just("confirm".to_string()),
        Just("yes".to_string()),
        Just("no".to_string()),
        Just("".to_string()),
        (1u8..=9).prop_map(|n| n.to_string()),
        "[a-zA-Z ]{0,20}",
    ]
}

// =============================================================================
// Structural Property Tests
// =============================================================================

proptest! {
    /// Steps never move backward and never skip: each transition lands on
    /// the same step, the next one, or back at the start of the dialogue.
    #[test]
    fn prop_steps_advance_in_order(inputs in proptest::collection::vec(input_strategy(), 0..40)) {
        let mut machine = FlowMachine::new();
        for input in &inputs {
            let before = step_index(machine.step());
            machine.handle(input, &[]);
            let after = step_index(machine.step());
            prop_assert!(
                after == before || after == before + 1 || after <= 1 && before > 0
                    || before == 0 && after == 0,
                "illegal transition {} -> {} on input {:?}",
                before,
                after,
                input
            );
            // Leaving idle only happens through the create command
            if before == 0 && after != 0 {
                prop_assert_eq!(input.trim().to_lowercase(), "/create");
            }
        }
    }

    /// "cancel" from any reachable state lands in idle, and a second
    /// "cancel" is a no-op (the machine reports it as inactive input).
    #[test]
    fn prop_cancel_is_idempotent(inputs in proptest::collection::vec(input_strategy(), 0..30)) {
        let mut machine = FlowMachine::new();
        for input in &inputs {
            machine.handle(input, &[]);
        }

        let first = machine.handle("cancel", &[]);
        prop_assert!(machine.step().is_idle());
        prop_assert!(
            matches!(first, FlowSignal::Cancelled { .. } | FlowSignal::Inactive),
            "expected Cancelled or Inactive, got {:?}",
            first
        );

        let second = machine.handle("cancel", &[]);
        prop_assert!(machine.step().is_idle());
        prop_assert_eq!(second, FlowSignal::Inactive);
    }

    /// Whatever path leads to completion, the draft has every collected
    /// field populated and a name distinct from all existing bots.
    #[test]
    fn prop_completed_draft_is_fully_populated(
        inputs in proptest::collection::vec(input_strategy(), 0..60),
        existing in proptest::collection::vec("[a-zA-Z]{1,8}", 0..5),
    ) {
        let mut machine = FlowMachine::new();
        for input in &inputs {
            if let FlowSignal::Completed { draft, .. } = machine.handle(input, &existing) {
                prop_assert!(!draft.name.trim().is_empty());
                prop_assert!(!draft.purpose_category.is_empty());
                prop_assert!(!draft.purpose_description.is_empty());
                prop_assert!(!draft.communication_style.is_empty());
                prop_assert!(machine.step().is_idle());
                prop_assert!(
                    !existing.iter().any(|n| n.trim().eq_ignore_ascii_case(draft.name.trim())),
                    "completed with taken name {:?}",
                    draft.name
                );
            }
        }
    }

    /// The step snapshot survives a serde round trip from any reachable
    /// state, so an interrupted dialogue can always resume.
    #[test]
    fn prop_any_reachable_step_round_trips(inputs in proptest::collection::vec(input_strategy(), 0..30)) {
        let mut machine = FlowMachine::new();
        for input in &inputs {
            machine.handle(input, &[]);
            let json = serde_json::to_string(machine.step()).unwrap();
            let restored: FlowStep = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(&restored, machine.step());
        }
    }
}

// =============================================================================
// Tests without parameters (outside proptest! macro)
// =============================================================================

#[test]
fn prop_fresh_machine_is_idle() {
    let machine = FlowMachine::new();
    assert!(machine.step().is_idle());
}

#[test]
fn prop_suggestions_only_apply_in_name_step() {
    let mut machine = FlowMachine::new();
    assert!(machine.apply_suggestions(vec!["Nova".into()]).is_none());

    machine.handle("/create", &[]);
    assert!(machine.apply_suggestions(vec!["Nova".into()]).is_some());

    machine.handle("Nova", &[]);
    assert!(machine.apply_suggestions(vec!["Late".into()]).is_none());
}
