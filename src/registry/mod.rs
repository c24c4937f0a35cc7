//! Endpoint registry
//!
//! ```text
//!                        EndpointRegistry
//!               ┌──────────────────────────────────┐
//!               │ endpoints: HashMap<EndpointKey,  │
//!               │   Arc<Endpoint {                 │
//!               │     state: Mutex<EndpointState { │
//!               │       listener, channels,        │
//!               │       clients,                   │
//!               │     }>,                          │
//!               │   }>                             │
//!               │ >                                │
//!               └────────────────┬─────────────────┘
//!                                │ run_round(frame)
//!            ┌───────────────────┼───────────────────┐
//!            ▼                   ▼                   ▼
//!      [ClientRecord]      [ClientRecord]      [ClientRecord]
//!       channel "0"         channel "0"         channel "1"
//! ```
//!
//! Each endpoint is locked independently, so producers feeding different
//! endpoints never wait on each other.

pub mod endpoint;
pub mod key;
pub mod store;

pub use endpoint::{BroadcastReport, Endpoint, EndpointState};
pub use key::EndpointKey;
pub use store::EndpointRegistry;
