//! Per-client session state

pub mod context;
pub mod state;

pub use context::ClientSnapshot;
pub use state::{ClientOutcome, ClientPhase, ClientRecord, Negotiation};
