use std::{sync::Mutex, time::Duration};

use tokio::time::{sleep_until, Instant};

use crate::{CallContext, Cancellation};

/// Longest slot spacing; slower rates saturate here.
const MAX_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Token bucket with capacity 1 refilled at `requests_per_second`.
///
/// Each acquisition reserves the next free dispatch slot; consecutive slots
/// are spaced by `1 / requests_per_second`. A non-positive or non-finite
/// rate disables limiting.
#[derive(Debug)]
pub(crate) struct RateLimiter {
    interval: Option<Duration>,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub(crate) fn new(requests_per_second: f64) -> Self {
        let interval = (requests_per_second.is_finite() && requests_per_second > 0.0)
            .then(|| {
                Duration::try_from_secs_f64(1.0 / requests_per_second)
                    .map_or(MAX_INTERVAL, |interval| interval.min(MAX_INTERVAL))
            });
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Waits for a dispatch slot or until `ctx` fires.
    ///
    /// Fails without waiting when the context already fired or when its
    /// deadline falls before the reserved slot. A wait interrupted by the
    /// context hands its slot back.
    pub(crate) async fn acquire(&self, ctx: &CallContext) -> Result<(), Cancellation> {
        ctx.check()?;
        let Some(interval) = self.interval else {
            return Ok(());
        };

        let now = Instant::now();
        let slot = {
            let mut next_slot = self.lock();
            let slot = next_slot.map_or(now, |next| next.max(now));
            if ctx.deadline().is_some_and(|deadline| slot > deadline) {
                return Err(Cancellation::DeadlineExceeded);
            }
            *next_slot = Some(slot + interval);
            slot
        };

        if slot <= now {
            return Ok(());
        }

        match ctx.run(sleep_until(slot)).await {
            Ok(()) => Ok(()),
            Err(reason) => {
                let mut next_slot = self.lock();
                // Only roll back if nobody reserved after us.
                if *next_slot == Some(slot + interval) {
                    *next_slot = Some(slot);
                }
                Err(reason)
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Instant>> {
        // The guarded value is a plain Instant; a poisoned lock still holds a usable one.
        self.next_slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
