//! The coordinator: polling control loop, per-trade state machine, two-phase
//! lock, clean-slate recovery, and the post-claim sweep.

pub mod coordinator;
pub mod retry;

pub use coordinator::{Coordinator, CoordinatorConfig};
pub use retry::RetryState;
