//! ─── Barter Operator Constants ──────────────────────────────────────────────
//!
//! Timing and retry parameters for the two-phase lock protocol. Values that
//! have an environment-variable override carry a `DEFAULT_` prefix; the rest
//! are protocol-fixed.

// ── Poll loop ────────────────────────────────────────────────────────────────

/// Coordinator poll interval (`POLL_INTERVAL_MS` override).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 15_000;

// ── Two-phase lock ───────────────────────────────────────────────────────────

/// Backoff between L2 `set-in-transit` attempts for one trade.
pub const LOCK_RETRY_BACKOFF_MS: u64 = 60_000;

/// L2 lock attempts before the L1 side is emergency-unlocked.
pub const LOCK_RETRY_MAX_ATTEMPTS: u32 = 5;

// ── Settlement worker ────────────────────────────────────────────────────────

/// Settlement check interval (`SETTLEMENT_INTERVAL_MS` override).
pub const DEFAULT_SETTLEMENT_INTERVAL_MS: u64 = 60_000;

/// Minimum pending off-chain actions before a settlement proof is generated
/// (`SETTLEMENT_MIN_ACTIONS` override).
pub const DEFAULT_SETTLEMENT_MIN_ACTIONS: usize = 1;

// ── Oracle ───────────────────────────────────────────────────────────────────

/// Price snapshot cache lifetime (`ORACLE_TTL_MS` override). ~8 minutes.
pub const DEFAULT_ORACLE_TTL_MS: u64 = 480_000;

// ── Local escrow daemon ──────────────────────────────────────────────────────

/// Base URL for per-trade daemons (`L2_DAEMON_BASE_URL` override).
pub const DEFAULT_DAEMON_BASE_URL: &str = "http://127.0.0.1";

/// First port handed out by the allocator (`L2_BASE_PORT` override).
pub const DEFAULT_L2_BASE_PORT: u16 = 18_232;

/// Number of ports the allocator may hand out (`L2_PORT_RANGE` override).
pub const DEFAULT_L2_PORT_RANGE: u16 = 200;

/// Hard timeout for the port liveness probe.
pub const PROBE_TIMEOUT_MS: u64 = 2_000;

/// Timeout for ordinary daemon / oracle / resolver HTTP calls.
pub const HTTP_TIMEOUT_MS: u64 = 5_000;

/// How long a freshly spawned daemon may take to become ready. Covers the
/// initial chain scan the daemon performs before serving `/address`.
pub const DAEMON_READY_TIMEOUT_MS: u64 = 540_000;
