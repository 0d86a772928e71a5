//! The guided `/create` dialogue that turns chat replies into a bot definition.
//!
//! `machine` is the pure state machine (no I/O); `service` drives it against
//! the stores and the platform API, owns the persisted snapshot, and guards
//! superseded name-suggestion fetches.

pub mod language;
pub mod machine;
pub mod palette;
pub mod prompt;
pub mod service;

pub use machine::{BotDraft, FlowMachine, FlowSignal, FlowStep};
pub use service::{FlowService, FlowTurn, NameSuggester};
