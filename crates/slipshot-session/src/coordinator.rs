//! Single-flight session renewal.
//!
//! [`RefreshCoordinator`] owns the renewal state for one client context. At
//! most one renewal network call is outstanding at a time; callers arriving
//! while it runs are queued and receive exactly that call's outcome. Failures
//! are counted, rate-limited by a cooldown, and once the session is beyond
//! recovery it is frozen in the expired state and the redirect hook fires
//! exactly once.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::classify::{Classification, classify};
use crate::config::RefreshConfig;
use crate::error::{RenewError, RenewResult};
use crate::renewer::{RedirectHook, SharedRedirect, SharedRenewer};

/// Mutable renewal state. Only touched while holding the coordinator lock,
/// and the lock is never held across an await.
///
/// Invariant: `is_expired` implies `!is_refreshing` and no waiters.
#[derive(Debug, Default)]
struct SessionState {
    /// A renewal network call is outstanding.
    is_refreshing: bool,

    /// Callers waiting on the outstanding renewal, in arrival order.
    waiters: Vec<oneshot::Sender<RenewResult>>,

    /// When the last renewal network call started.
    last_attempt_at: Option<Instant>,

    consecutive_failures: u32,

    is_expired: bool,

    /// The redirect side effect has fired.
    is_redirecting: bool,

    /// Total renewal network calls issued.
    attempts: u64,

    /// Bumped by every `reset`; a renewal started under an older epoch
    /// settles without touching the state of the new session.
    epoch: u64,
}

impl SessionState {
    /// Freeze the session. Returns true if the redirect should fire now.
    fn expire(&mut self) -> bool {
        self.is_expired = true;
        let fire = !self.is_redirecting;
        self.is_redirecting = true;
        fire
    }
}

/// Read-only view of the coordinator state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub is_refreshing: bool,
    pub waiters: usize,
    pub consecutive_failures: u32,
    pub is_expired: bool,
    pub is_redirecting: bool,
    pub attempts: u64,
}

/// How a call to `renew` proceeds after the state check.
enum Entry {
    /// Another caller is renewing; wait for its outcome.
    Wait(oneshot::Receiver<RenewResult>),
    /// Refused without a network call.
    Refused(Settlement),
    /// This caller issues the network call, for the given session epoch.
    Lead(u64),
}

/// Outcome to hand out once the lock is released.
struct Settlement {
    result: RenewResult,
    waiters: Vec<oneshot::Sender<RenewResult>>,
    redirect: bool,
}

impl Settlement {
    fn refused(error: RenewError) -> Self {
        Self {
            result: Err(error),
            waiters: Vec::new(),
            redirect: false,
        }
    }

    fn deliver(self, hook: &dyn RedirectHook) -> RenewResult {
        for waiter in self.waiters {
            // A waiter that stopped listening simply misses the result.
            let _ = waiter.send(self.result.clone());
        }
        if self.redirect
            && let Err(reason) = &self.result
        {
            hook.redirect_to_login(reason);
        }
        self.result
    }
}

/// Coordinates session renewal for one client context.
///
/// Build one per context and share it by `Arc` with every component that
/// issues authenticated requests.
pub struct RefreshCoordinator {
    state: Mutex<SessionState>,
    renewer: SharedRenewer,
    redirect: SharedRedirect,
    config: RefreshConfig,
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("state", &self.snapshot())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RefreshCoordinator {
    /// Create a coordinator in the initial (valid, idle) state.
    pub fn new(renewer: SharedRenewer, redirect: SharedRedirect, config: RefreshConfig) -> Self {
        Self {
            state: Mutex::new(SessionState::default()),
            renewer,
            redirect,
            config,
        }
    }

    /// Get the coordinator configuration.
    pub fn config(&self) -> &RefreshConfig {
        &self.config
    }

    /// Whether renewal can still be attempted at all.
    pub fn is_valid(&self) -> bool {
        let state = self.state.lock();
        !state.is_expired && !state.is_redirecting
    }

    /// Current state, for diagnostics.
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock();
        SessionSnapshot {
            is_refreshing: state.is_refreshing,
            waiters: state.waiters.len(),
            consecutive_failures: state.consecutive_failures,
            is_expired: state.is_expired,
            is_redirecting: state.is_redirecting,
            attempts: state.attempts,
        }
    }

    /// Return to the initial state after a successful interactive login.
    ///
    /// A renewal already in flight is left to settle on its own; its waiters
    /// still receive its outcome, but it no longer changes counters or flags.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.epoch += 1;
        state.consecutive_failures = 0;
        state.is_expired = false;
        state.is_redirecting = false;
        state.last_attempt_at = None;
        info!("Session state reset");
    }

    /// Renew the session, sharing any renewal already in flight.
    pub async fn renew(&self) -> RenewResult {
        match self.enter(Instant::now()) {
            Entry::Wait(rx) => rx.await.unwrap_or(Err(RenewError::Abandoned)),
            Entry::Refused(settlement) => settlement.deliver(self.redirect.as_ref()),
            Entry::Lead(epoch) => self.lead(epoch).await,
        }
    }

    fn enter(&self, now: Instant) -> Entry {
        let mut state = self.state.lock();

        if state.is_refreshing {
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            trace!(waiters = state.waiters.len(), "Renewal in flight, queued");
            return Entry::Wait(rx);
        }

        if state.is_expired || state.is_redirecting {
            debug!("Renewal refused, session expired");
            return Entry::Refused(Settlement::refused(RenewError::SessionExpired));
        }

        if let Some(last) = state.last_attempt_at {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.config.cooldown {
                let remaining = self.config.cooldown - elapsed;
                debug!(remaining_ms = remaining.as_millis() as u64, "Renewal refused, cooldown active");
                return Entry::Refused(Settlement::refused(RenewError::Cooldown { remaining }));
            }
        }

        if state.consecutive_failures >= self.config.max_failures {
            let failures = state.consecutive_failures;
            warn!(failures, "Renewal failure limit reached, expiring session");
            let redirect = state.expire();
            return Entry::Refused(Settlement {
                result: Err(RenewError::FailureLimit { failures }),
                waiters: Vec::new(),
                redirect,
            });
        }

        state.is_refreshing = true;
        state.last_attempt_at = Some(now);
        state.attempts += 1;
        Entry::Lead(state.epoch)
    }

    async fn lead(&self, epoch: u64) -> RenewResult {
        let mut guard = InFlight {
            coordinator: self,
            armed: true,
        };

        info!("Renewing session");
        let response = self.renewer.renew().await;
        guard.armed = false;

        self.settle(classify(&response), epoch)
            .deliver(self.redirect.as_ref())
    }

    fn settle(&self, classification: Classification, epoch: u64) -> Settlement {
        let mut state = self.state.lock();
        state.is_refreshing = false;
        let waiters = std::mem::take(&mut state.waiters);

        if state.epoch != epoch {
            debug!(waiters = waiters.len(), "Renewal from a previous session settled, state untouched");
            let result = match classification {
                Classification::Renewed => Ok(()),
                Classification::Failed(kind) if kind.is_terminal() => {
                    Err(RenewError::Rejected(kind))
                }
                Classification::Failed(kind) => Err(RenewError::Failed(kind)),
            };
            return Settlement {
                result,
                waiters,
                redirect: false,
            };
        }

        let (result, redirect) = match classification {
            Classification::Renewed => {
                state.consecutive_failures = 0;
                info!(waiters = waiters.len(), "Session renewed");
                (Ok(()), false)
            }
            Classification::Failed(kind) => {
                state.consecutive_failures += 1;
                let failures = state.consecutive_failures;

                if kind.is_terminal() {
                    warn!(kind = %kind, failures, "Session renewal rejected");
                    (Err(RenewError::Rejected(kind)), state.expire())
                } else if failures >= self.config.max_failures {
                    warn!(kind = %kind, failures, "Session renewal failure limit reached");
                    (Err(RenewError::FailureLimit { failures }), state.expire())
                } else {
                    debug!(kind = %kind, failures, "Session renewal failed");
                    (Err(RenewError::Failed(kind)), false)
                }
            }
        };

        Settlement {
            result,
            waiters,
            redirect,
        }
    }

    /// Release the in-flight flag after the leader was cancelled or panicked.
    fn abandon(&self) -> Settlement {
        let mut state = self.state.lock();
        state.is_refreshing = false;
        let waiters = std::mem::take(&mut state.waiters);
        debug!(waiters = waiters.len(), "Renewal abandoned");
        Settlement {
            result: Err(RenewError::Abandoned),
            waiters,
            redirect: false,
        }
    }

    /// Time left before another renewal may be attempted.
    pub fn cooldown_remaining(&self) -> Duration {
        let state = self.state.lock();
        state
            .last_attempt_at
            .map(|last| {
                self.config
                    .cooldown
                    .saturating_sub(Instant::now().saturating_duration_since(last))
            })
            .unwrap_or(Duration::ZERO)
    }
}

/// Clears `is_refreshing` if the leading future never reaches `settle`.
struct InFlight<'a> {
    coordinator: &'a RefreshCoordinator,
    armed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.coordinator
                .abandon()
                .deliver(self.coordinator.redirect.as_ref());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use futures::future::join_all;

    use super::*;
    use crate::classify::FailureKind;
    use crate::renewer::{RenewalResponse, Renewer};

    const CALL_LATENCY: Duration = Duration::from_millis(50);

    #[derive(Default)]
    struct ScriptedRenewer {
        responses: Mutex<VecDeque<RenewalResponse>>,
        calls: AtomicUsize,
    }

    impl ScriptedRenewer {
        fn with(responses: Vec<RenewalResponse>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Renewer for ScriptedRenewer {
        async fn renew(&self) -> RenewalResponse {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(CALL_LATENCY).await;
            self.responses.lock().pop_front().unwrap_or(ok())
        }
    }

    #[derive(Default)]
    struct CountingRedirect(AtomicUsize);

    impl RedirectHook for CountingRedirect {
        fn redirect_to_login(&self, _reason: &RenewError) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn ok() -> RenewalResponse {
        RenewalResponse::Completed {
            status: 200,
            body: r#"{"detail":"Token refreshed","authenticated":true}"#.to_string(),
        }
    }

    fn rejected(code: &str) -> RenewalResponse {
        RenewalResponse::Completed {
            status: 401,
            body: format!(r#"{{"error":"refresh failed","code":"{}"}}"#, code),
        }
    }

    fn setup(
        responses: Vec<RenewalResponse>,
    ) -> (Arc<RefreshCoordinator>, Arc<ScriptedRenewer>, Arc<CountingRedirect>) {
        let renewer = ScriptedRenewer::with(responses);
        let redirect = Arc::new(CountingRedirect::default());
        let coordinator = Arc::new(RefreshCoordinator::new(
            renewer.clone(),
            redirect.clone(),
            RefreshConfig::default(),
        ));
        (coordinator, renewer, redirect)
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_renewals_share_one_call() {
        let (coordinator, renewer, _) = setup(vec![ok()]);

        let results = join_all((0..5).map(|_| coordinator.renew())).await;

        assert_eq!(renewer.calls(), 1);
        assert!(results.iter().all(|r| r.is_ok()));
        let snap = coordinator.snapshot();
        assert!(!snap.is_refreshing);
        assert_eq!(snap.waiters, 0);
        assert_eq!(snap.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_failure_broadcast_and_single_redirect() {
        let (coordinator, renewer, redirect) = setup(vec![rejected("REFRESH_TOKEN_EXPIRED")]);

        let results = join_all((0..4).map(|_| coordinator.renew())).await;

        assert_eq!(renewer.calls(), 1);
        for result in results {
            assert_eq!(result, Err(RenewError::Rejected(FailureKind::Expired)));
        }
        assert_eq!(redirect.0.load(Ordering::SeqCst), 1);
        assert!(!coordinator.is_valid());

        let snap = coordinator.snapshot();
        assert!(snap.is_expired);
        assert!(!snap.is_refreshing);
        assert_eq!(snap.waiters, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiters_queue_while_in_flight() {
        let (coordinator, renewer, _) = setup(vec![ok()]);

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let c = coordinator.clone();
                tokio::spawn(async move { c.renew().await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(10)).await;
        let snap = coordinator.snapshot();
        assert!(snap.is_refreshing);
        assert_eq!(snap.waiters, 2);

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(()));
        }
        assert_eq!(renewer.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_blocks_second_attempt() {
        let (coordinator, renewer, _) = setup(vec![ok(), ok()]);

        assert_eq!(coordinator.renew().await, Ok(()));

        let second = coordinator.renew().await;
        assert!(matches!(second, Err(RenewError::Cooldown { .. })));
        assert!(!second.unwrap_err().is_terminal());
        assert_eq!(renewer.calls(), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(coordinator.renew().await, Ok(()));
        assert_eq!(renewer.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_lock_out_session() {
        let (coordinator, renewer, redirect) = setup(vec![
            rejected("REFRESH_TOKEN_INVALID"),
            rejected("REFRESH_TOKEN_INVALID"),
            rejected("REFRESH_TOKEN_INVALID"),
        ]);

        for _ in 0..2 {
            assert_eq!(
                coordinator.renew().await,
                Err(RenewError::Failed(FailureKind::Invalid))
            );
            assert!(coordinator.is_valid());
            tokio::time::advance(Duration::from_secs(2)).await;
        }

        assert_eq!(
            coordinator.renew().await,
            Err(RenewError::FailureLimit { failures: 3 })
        );
        assert!(!coordinator.is_valid());
        assert_eq!(redirect.0.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(coordinator.renew().await, Err(RenewError::SessionExpired));
        assert_eq!(renewer.calls(), 3);
        assert_eq!(redirect.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_session_refuses_without_network() {
        let (coordinator, renewer, _) = setup(vec![rejected("REFRESH_TOKEN_MISSING")]);

        assert!(coordinator.renew().await.unwrap_err().is_terminal());
        tokio::time::advance(Duration::from_secs(10)).await;

        for _ in 0..3 {
            assert_eq!(coordinator.renew().await, Err(RenewError::SessionExpired));
        }
        assert_eq!(renewer.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_restores_capability() {
        let (coordinator, renewer, _) = setup(vec![rejected("REFRESH_TOKEN_REVOKED"), ok()]);

        assert_eq!(
            coordinator.renew().await,
            Err(RenewError::Rejected(FailureKind::Revoked))
        );
        assert!(!coordinator.is_valid());

        coordinator.reset();
        assert!(coordinator.is_valid());
        assert_eq!(coordinator.cooldown_remaining(), Duration::ZERO);

        assert_eq!(coordinator.renew().await, Ok(()));
        assert_eq!(renewer.calls(), 2);
        assert_eq!(coordinator.snapshot().consecutive_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_during_renewal_keeps_new_session_valid() {
        let (coordinator, renewer, redirect) = setup(vec![rejected("REFRESH_TOKEN_EXPIRED"), ok()]);

        let stale = {
            let c = coordinator.clone();
            tokio::spawn(async move { c.renew().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Interactive login completes while the old renewal is still out.
        coordinator.reset();

        assert_eq!(
            stale.await.unwrap(),
            Err(RenewError::Rejected(FailureKind::Expired))
        );
        assert!(coordinator.is_valid());
        assert_eq!(redirect.0.load(Ordering::SeqCst), 0);

        let snap = coordinator.snapshot();
        assert!(!snap.is_expired);
        assert!(!snap.is_redirecting);
        assert!(!snap.is_refreshing);
        assert_eq!(snap.consecutive_failures, 0);

        // The new session renews normally.
        assert_eq!(coordinator.renew().await, Ok(()));
        assert_eq!(renewer.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_failure_counter() {
        let (coordinator, _, _) = setup(vec![
            RenewalResponse::Unreachable {
                reason: "offline".to_string(),
            },
            ok(),
        ]);

        assert_eq!(
            coordinator.renew().await,
            Err(RenewError::Failed(FailureKind::Network))
        );
        assert_eq!(coordinator.snapshot().consecutive_failures, 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(coordinator.renew().await, Ok(()));
        assert_eq!(coordinator.snapshot().consecutive_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_leader_releases_waiters() {
        let (coordinator, _, _) = setup(vec![ok()]);

        let leader = {
            let c = coordinator.clone();
            tokio::spawn(async move { c.renew().await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;

        let waiter = {
            let c = coordinator.clone();
            tokio::spawn(async move { c.renew().await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(coordinator.snapshot().waiters, 1);

        leader.abort();
        assert_eq!(waiter.await.unwrap(), Err(RenewError::Abandoned));

        let snap = coordinator.snapshot();
        assert!(!snap.is_refreshing);
        assert_eq!(snap.consecutive_failures, 0);
        assert!(coordinator.is_valid());
    }
}
