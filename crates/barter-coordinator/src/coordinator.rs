use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use barter_core::{
    rates::apply_slippage_floor, BarterError, CombinedState, L2Address, L2State, TradeKey,
    TradeRecord, TxHash, DEFAULT_POLL_INTERVAL_MS,
};
use barter_escrowd::{LocalEscrow, ProbeOutcome};
use barter_oracle::RateSource;
use barter_pool::{ActiveTrade, EscrowPool};
use barter_resolver::AddressDirectory;

use crate::retry::RetryState;

#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    pub poll_interval: Duration,
    /// Tolerated price movement between snapshot and daemon-side check.
    pub slippage_bps: u32,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            slippage_bps: 0,
        }
    }
}

/// Drives every active trade through the two-phase lock and the post-claim
/// sweep. Single logical worker: all trade state lives in plain maps behind
/// `&mut self`, and per-key re-entry is fenced by `locking_in_progress`.
pub struct Coordinator<P, E, R, D> {
    pool: Arc<P>,
    escrowd: Arc<E>,
    rates: Arc<R>,
    directory: Arc<D>,
    config: CoordinatorConfig,

    /// Trades whose L1 lock we have submitted; kept for the rest of the
    /// trade's lifetime so `lockTrade` is never re-submitted.
    locked_trades: HashMap<TradeKey, TradeRecord>,
    /// Backoff ledger for the L2 lock step.
    lock_retry: HashMap<TradeKey, RetryState>,
    /// At-most-once guard: the L1 lock transaction per key.
    l1_lock_tx: HashMap<TradeKey, TxHash>,
    /// Per-key critical section marker.
    locking_in_progress: HashSet<TradeKey>,
}

impl<P, E, R, D> Coordinator<P, E, R, D>
where
    P: EscrowPool,
    E: LocalEscrow,
    R: RateSource,
    D: AddressDirectory,
{
    pub fn new(
        pool: Arc<P>,
        escrowd: Arc<E>,
        rates: Arc<R>,
        directory: Arc<D>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            pool,
            escrowd,
            rates,
            directory,
            config,
            locked_trades: HashMap::new(),
            lock_retry: HashMap::new(),
            l1_lock_tx: HashMap::new(),
            locking_in_progress: HashSet::new(),
        }
    }

    /// Connect the pool backend, then reconcile half-locked trades left
    /// behind by a previous process before the first poll cycle runs.
    pub async fn initialize(&mut self) -> Result<(), BarterError> {
        self.pool.connect().await?;
        self.clean_slate_recovery().await
    }

    /// Emergency-unlock every on-chain lock whose L2 counterpart is not in
    /// transit. A crashed predecessor can only have left L1 locked ahead of
    /// L2, so this returns the pool to a lockable state.
    async fn clean_slate_recovery(&mut self) -> Result<(), BarterError> {
        let active = self.pool.get_active_trades().await?;
        for trade in active.iter().filter(|t| t.record.in_transit) {
            let l2_locked = match self.escrowd.get_status(&trade.key).await {
                Ok(Some(state)) => state.in_transit,
                Ok(None) => false,
                Err(e) => {
                    warn!(key = %trade.key, error = %e, "daemon unreachable during recovery");
                    false
                }
            };
            if l2_locked {
                debug!(key = %trade.key, "both sides locked; leaving in place");
                continue;
            }
            info!(key = %trade.key, "clean-slate recovery: emergency unlocking");
            match self.pool.emergency_unlock(&trade.key).await {
                Ok(tx) => info!(key = %trade.key, %tx, "recovery unlock submitted"),
                Err(e) => warn!(key = %trade.key, error = %e, "recovery unlock failed"),
            }
        }
        Ok(())
    }

    /// Add a trade key to the tracked set (persisted by the pool client).
    pub async fn register_trade(&self, key: &TradeKey) -> Result<(), BarterError> {
        info!(key = %key, "registering trade for monitoring");
        self.pool.register_trade(key).await
    }

    /// One logical tick: evaluate every active trade, then sweep trades
    /// whose L1 record vanished. Per-key failures never abort the cycle.
    pub async fn run_cycle(&mut self) {
        let active = match self.pool.get_active_trades().await {
            Ok(active) => active,
            Err(e) => {
                warn!(error = %e, "failed to fetch active trades; skipping cycle");
                return;
            }
        };
        let active_keys: HashSet<TradeKey> = active.iter().map(|t| t.key.clone()).collect();
        debug!(active = active.len(), locked = self.locked_trades.len(), "poll cycle");

        for trade in &active {
            if let Err(e) = self.process_trade(trade).await {
                warn!(key = %trade.key, error = %e, "trade processing failed");
            }
        }

        // The L1 record vanished for these: claimed or refunded upstream.
        let vanished: Vec<(TradeKey, TradeRecord)> = self
            .locked_trades
            .iter()
            .filter(|(key, _)| !active_keys.contains(*key))
            .map(|(key, record)| (key.clone(), record.clone()))
            .collect();
        for (key, cached) in vanished {
            if let Err(e) = self.handle_post_claim(&key, &cached).await {
                warn!(key = %key, error = %e, "post-claim handling failed");
            }
        }
    }

    async fn process_trade(&mut self, trade: &ActiveTrade) -> Result<(), BarterError> {
        let key = &trade.key;

        let retry_pending = self.lock_retry.contains_key(key);
        if self.locked_trades.contains_key(key) && !retry_pending {
            // L1 lock done and L2 settled (or in flight); the post-claim
            // pass drives completion once the record vanishes.
            debug!(key = %key, "already locked; nothing to do");
            return Ok(());
        }
        if self.locking_in_progress.contains(key) {
            debug!(key = %key, "lock already in progress; skipping this cycle");
            return Ok(());
        }

        if self.escrowd.probe(key).await == ProbeOutcome::Foreign {
            warn!(key = %key, "daemon port occupied by a foreign process; skipping");
            return Ok(());
        }

        let record = self.pool.get_trade(key).await?;
        let l2 = match self.escrowd.get_status(key).await {
            Ok(state) => state,
            Err(e) => {
                debug!(key = %key, error = %e, "daemon unreachable");
                None
            }
        };
        let combined = CombinedState::new(key.clone(), record, l2);
        let ready = combined.ready_to_lock();
        let (Some(record), Some(l2)) = (combined.record, combined.l2) else {
            debug!(key = %key, "one side not observable yet; skipping");
            return Ok(());
        };

        if retry_pending || ready {
            self.lock_both_sides(key.clone(), record, l2).await?;
        }
        Ok(())
    }

    /// The two-phase lock, serialized per key.
    async fn lock_both_sides(
        &mut self,
        key: TradeKey,
        record: TradeRecord,
        l2: L2State,
    ) -> Result<(), BarterError> {
        if !self.locking_in_progress.insert(key.clone()) {
            return Ok(());
        }
        let result = self.lock_phases(&key, &record, &l2).await;
        self.locking_in_progress.remove(&key);
        result
    }

    async fn lock_phases(
        &mut self,
        key: &TradeKey,
        record: &TradeRecord,
        l2: &L2State,
    ) -> Result<(), BarterError> {
        // Phase 0: pricing and identity. An oracle failure aborts before any
        // state is touched.
        let snapshot = self.rates.snapshot().await?;
        let claimant = self.resolve_claimant(record, l2).await;

        // Phase 1: L1 lock, at most once per key for the process lifetime.
        let l1_tx = match self.l1_lock_tx.get(key) {
            Some(tx) => tx.clone(),
            None => {
                let tx = self.pool.lock_trade(key, &claimant).await?;
                info!(key = %key, %tx, claimant = %claimant, "L1 side locked");
                self.l1_lock_tx.insert(key.clone(), tx.clone());
                self.locked_trades.insert(key.clone(), record.clone());
                tx
            }
        };

        // Phase 2: L2 lock with backoff. Sanity-check the cross-rate before
        // asking the daemon to commit anything.
        let equivalent = snapshot.l2_equivalent(record.amount)?;
        let floor = apply_slippage_floor(equivalent, self.config.slippage_bps);
        if floor == 0 {
            return Err(BarterError::NonPositivePrice {
                numerator: equivalent,
                denominator: 10_000,
            });
        }

        if let Some(state) = self.lock_retry.get(key) {
            if state.exhausted() {
                // A previous unlock attempt failed; finish it before any
                // further daemon call.
                return self.abort_lock(key).await;
            }
            if !state.due() {
                debug!(key = %key, attempts = state.attempts, "L2 lock backing off");
                return Ok(());
            }
        }

        if self
            .escrowd
            .set_in_transit(key, &l1_tx, record.amount, &snapshot)
            .await?
        {
            self.lock_retry.remove(key);
            info!(key = %key, expected_l2 = %equivalent, "L2 side locked; trade in transit");
            return Ok(());
        }

        let state = self.lock_retry.entry(key.clone()).or_default();
        state.record_failure();
        let attempts = state.attempts;
        let exhausted = state.exhausted();
        warn!(key = %key, attempts, "daemon refused L2 lock");
        if exhausted {
            return self.abort_lock(key).await;
        }
        Ok(())
    }

    /// Terminal L2 failure: release the L1 side and forget the trade.
    async fn abort_lock(&mut self, key: &TradeKey) -> Result<(), BarterError> {
        warn!(key = %key, "L2 lock failed terminally; emergency unlocking L1");
        let tx = self.pool.emergency_unlock(key).await?;
        info!(key = %key, %tx, "emergency unlock submitted");
        self.l1_lock_tx.remove(key);
        self.locked_trades.remove(key);
        self.lock_retry.remove(key);
        Ok(())
    }

    /// Claimant for the L1 lock: the counterparty's L1 address resolved from
    /// the L2 origin. A resolver miss downgrades to the depositor — the lock
    /// still happens, but the L1 proceeds return to the depositor on claim.
    async fn resolve_claimant(&self, record: &TradeRecord, l2: &L2State) -> barter_core::L1Address {
        if let Some(origin) = l2.origin_address.as_deref().filter(|o| !o.is_empty()) {
            let origin = L2Address::new(origin);
            if let Some(row) = self.directory.lookup_by_l2(&origin).await {
                return row.l1_address;
            }
            warn!(%origin, "resolver miss for claimant; falling back to depositor");
        } else {
            warn!("daemon reported no L2 origin; falling back to depositor");
        }
        record.depositor.clone()
    }

    /// The L1 record is gone: the counterparty claimed, or the depositor
    /// refunded. The daemon tells us which side of that fork we are on.
    async fn handle_post_claim(
        &mut self,
        key: &TradeKey,
        cached: &TradeRecord,
    ) -> Result<(), BarterError> {
        info!(key = %key, "L1 record vanished; checking the L2 side");
        let state = match self.escrowd.get_status(key).await {
            Err(e) => {
                warn!(key = %key, error = %e, "daemon unreachable; dropping cached trade");
                self.drop_cached(key);
                return Ok(());
            }
            Ok(None) => {
                debug!(key = %key, "daemon has no state; dropping cached trade");
                self.drop_cached(key);
                return Ok(());
            }
            Ok(Some(state)) => state,
        };

        if !state.in_transit {
            debug!(key = %key, "L2 side already settled or unlocked; dropping cached trade");
            self.drop_cached(key);
            return Ok(());
        }

        // L2 is still locked: forward it to the depositor's L2 address. On a
        // resolver miss the entry stays cached and the sweep retries next
        // cycle — the daemon keeps holding the funds.
        let Some(row) = self.directory.lookup_by_l1(&cached.depositor).await else {
            warn!(key = %key, depositor = %cached.depositor, "no L2 address for sweep target; retrying next cycle");
            return Ok(());
        };
        if self.escrowd.send_to_target(key, &row.l2_address).await? {
            info!(key = %key, target = %row.l2_address, "post-claim sweep complete");
            self.locked_trades.remove(key);
        } else {
            warn!(key = %key, "daemon refused sweep; retrying next cycle");
        }
        Ok(())
    }

    fn drop_cached(&mut self, key: &TradeKey) {
        self.locked_trades.remove(key);
        self.l1_lock_tx.remove(key);
    }

    fn clear(&mut self) {
        self.locked_trades.clear();
        self.lock_retry.clear();
        self.l1_lock_tx.clear();
        self.locking_in_progress.clear();
    }

    /// Poll until shutdown. Stop is non-interrupting: the in-flight cycle
    /// finishes, further ones are suppressed, and the in-memory maps are
    /// cleared on the way out.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            interval_ms = self.config.poll_interval.as_millis() as u64,
            "coordinator started"
        );
        loop {
            tokio::select! {
                _ = ticker.tick() => self.run_cycle().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        self.clear();
        info!("coordinator stopped; in-memory state cleared");
    }

    // Test-only visibility into the coordinator-local maps.
    #[doc(hidden)]
    pub fn locked_trades(&self) -> &HashMap<TradeKey, TradeRecord> {
        &self.locked_trades
    }

    #[doc(hidden)]
    pub fn lock_retry(&self) -> &HashMap<TradeKey, RetryState> {
        &self.lock_retry
    }

    #[doc(hidden)]
    pub fn l1_lock_tx(&self) -> &HashMap<TradeKey, TxHash> {
        &self.l1_lock_tx
    }
}
