//! HTTP client to the per-trade local escrow daemons (the L2 side).
//!
//! Each active trade gets its own daemon process listening on a port handed
//! out by the allocator; this crate only speaks the daemon's REST surface —
//! spawning and supervising the processes is someone else's job.

pub mod allocator;
pub mod client;
pub mod types;

pub use allocator::PortAllocator;
pub use client::{EscrowdClient, EscrowdConfig, LocalEscrow, ProbeOutcome};
pub use types::DaemonAddresses;
