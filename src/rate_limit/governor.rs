//! Sliding-window request governor keyed by client identity.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, warn};

use super::{Endpoint, WindowKind};
use crate::config::RateLimitConfig;
use crate::error::{FacilitatorError, FacilitatorResult};

const MINUTE: Duration = Duration::from_mins(1);
const HOUR: Duration = Duration::from_hours(1);
const DAY: Duration = Duration::from_hours(24);

/// Ceiling for one window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowLimit {
    /// Which window this is.
    pub kind: WindowKind,
    /// Maximum admissions inside `period`.
    pub max: u32,
    /// Window length.
    pub period: Duration,
}

impl WindowLimit {
    const fn new(kind: WindowKind, max: u32, period: Duration) -> Self {
        Self { kind, max, period }
    }
}

/// Successful admission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Admission {
    /// Smallest number of remaining slots across the windows checked.
    pub remaining: u32,
    /// Ceiling of the window with the fewest remaining slots.
    pub limit: u32,
}

/// Admission instants per window for one client.
#[derive(Debug, Default)]
struct ClientWindows {
    daily: VecDeque<Instant>,
    hourly: VecDeque<Instant>,
    chat_minute: VecDeque<Instant>,
    conclusion_minute: VecDeque<Instant>,
}

impl ClientWindows {
    const fn log_mut(&mut self, kind: WindowKind) -> &mut VecDeque<Instant> {
        match kind {
            WindowKind::Daily => &mut self.daily,
            WindowKind::Hourly => &mut self.hourly,
            WindowKind::ChatPerMinute => &mut self.chat_minute,
            WindowKind::ConclusionPerMinute => &mut self.conclusion_minute,
        }
    }

    fn is_empty(&self) -> bool {
        self.daily.is_empty()
            && self.hourly.is_empty()
            && self.chat_minute.is_empty()
            && self.conclusion_minute.is_empty()
    }

    /// Check every window, then record `now` in all of them if none is full.
    fn admit(&mut self, limits: &[WindowLimit], now: Instant) -> FacilitatorResult<Admission> {
        let mut admission = Admission {
            remaining: u32::MAX,
            limit: 0,
        };

        for limit in limits {
            let log = self.log_mut(limit.kind);
            prune(log, now, limit.period);

            let used = u32::try_from(log.len()).unwrap_or(u32::MAX);
            if used >= limit.max {
                return Err(FacilitatorError::RateLimited {
                    window: limit.kind,
                    retry_after_secs: retry_after(log, now, limit.period),
                });
            }

            let remaining = limit.max - used - 1;
            if remaining < admission.remaining {
                admission = Admission {
                    remaining,
                    limit: limit.max,
                };
            }
        }

        for limit in limits {
            self.log_mut(limit.kind).push_back(now);
        }

        Ok(admission)
    }
}

/// Drop admissions that fell out of the window.
fn prune(log: &mut VecDeque<Instant>, now: Instant, period: Duration) {
    while let Some(&oldest) = log.front() {
        if now.saturating_duration_since(oldest) >= period {
            log.pop_front();
        } else {
            break;
        }
    }
}

/// Whole seconds until the oldest admission leaves the window, at least 1.
fn retry_after(log: &VecDeque<Instant>, now: Instant, period: Duration) -> u64 {
    let Some(&oldest) = log.front() else {
        return 1;
    };
    let remaining = period.saturating_sub(now.saturating_duration_since(oldest));
    let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
    secs.max(1)
}

/// Per-client admission control across overlapping sliding windows.
///
/// Every request counts against the global daily and hourly windows plus the
/// per-minute window of its endpoint. All windows are checked before any is
/// recorded, and both steps run under the client's map-entry lock, so a
/// rejected request never consumes a slot and concurrent requests from the
/// same client cannot overshoot a ceiling.
#[derive(Debug)]
pub struct RateGovernor {
    daily: WindowLimit,
    hourly: WindowLimit,
    chat_minute: WindowLimit,
    conclusion_minute: WindowLimit,
    clients: DashMap<String, ClientWindows>,
}

impl RateGovernor {
    /// Build a governor from configured ceilings.
    #[must_use]
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            daily: WindowLimit::new(WindowKind::Daily, config.daily, DAY),
            hourly: WindowLimit::new(WindowKind::Hourly, config.hourly, HOUR),
            chat_minute: WindowLimit::new(WindowKind::ChatPerMinute, config.chat_per_minute, MINUTE),
            conclusion_minute: WindowLimit::new(
                WindowKind::ConclusionPerMinute,
                config.conclusion_per_minute,
                MINUTE,
            ),
            clients: DashMap::new(),
        }
    }

    /// Windows an endpoint participates in.
    #[must_use]
    pub const fn limits_for(&self, endpoint: Endpoint) -> [WindowLimit; 3] {
        let minute = match endpoint {
            Endpoint::Chat => self.chat_minute,
            Endpoint::Conclusion => self.conclusion_minute,
        };
        [self.daily, self.hourly, minute]
    }

    /// Admit or reject a request from `identity` now.
    ///
    /// # Errors
    /// Returns `FacilitatorError::RateLimited` if any window is full.
    pub fn check(&self, identity: &str, endpoint: Endpoint) -> FacilitatorResult<Admission> {
        self.check_at(identity, endpoint, Instant::now())
    }

    /// Admit or reject a request from `identity` at `now`.
    ///
    /// # Errors
    /// Returns `FacilitatorError::RateLimited` if any window is full.
    pub fn check_at(
        &self,
        identity: &str,
        endpoint: Endpoint,
        now: Instant,
    ) -> FacilitatorResult<Admission> {
        let limits = self.limits_for(endpoint);
        let outcome = self
            .clients
            .entry(identity.to_string())
            .or_default()
            .admit(&limits, now);

        if let Err(FacilitatorError::RateLimited {
            window,
            retry_after_secs,
        }) = &outcome
        {
            warn!(
                client = identity,
                window = %window,
                retry_after_secs,
                "Rate limit exceeded"
            );
        }
        outcome
    }

    /// Prune expired admissions and evict clients with nothing left.
    ///
    /// Returns the number of evicted clients.
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.clients.len();
        let all = [self.daily, self.hourly, self.chat_minute, self.conclusion_minute];

        self.clients.retain(|_, windows| {
            for limit in &all {
                prune(windows.log_mut(limit.kind), now, limit.period);
            }
            !windows.is_empty()
        });

        let evicted = before.saturating_sub(self.clients.len());
        debug!(evicted, tracked = self.clients.len(), "Rate limit sweep");
        evicted
    }

    /// Number of client identities currently tracked.
    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }
}
