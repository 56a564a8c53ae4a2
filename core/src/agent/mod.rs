//! Turn orchestration split into smaller files for readability.
//! - directive.rs: parsing the provider's tool decision
//! - prompt.rs: selection and interpretation prompts, fallback texts
//! - instance.rs: the Agent and its turn state machine
//! - turn.rs: requests, states and turn reports
//! - stats.rs: concurrent turn counters

mod directive;
mod instance;
mod prompt;
mod stats;
mod turn;

pub use directive::{parse_directive, Directive};
pub use instance::Agent;
pub use stats::{AgentStats, AgentStatsSnapshot};
pub use turn::{AgentRequest, TurnReport, TurnState};
