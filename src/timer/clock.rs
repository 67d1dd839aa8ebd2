use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};

/// Fixed tick step applied by the engine, in milliseconds.
pub const TICK_MS: u64 = 10;

/// Keeps a tick subscription alive; dropping it stops the callbacks.
pub struct ClockSubscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl ClockSubscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for ClockSubscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

/// Source of evenly spaced ticks. Injectable so tests drive ticks manually
/// instead of depending on wall-clock timing.
pub trait Clock {
    fn subscribe(&self, on_tick: Box<dyn FnMut() + Send>) -> ClockSubscription;
}

/// Production clock backed by a tokio interval task.
///
/// Must be subscribed from within a tokio runtime.
pub struct TokioClock {
    period: Duration,
}

impl TokioClock {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    pub fn default_tick() -> Self {
        Self::new(Duration::from_millis(TICK_MS))
    }
}

impl Clock for TokioClock {
    fn subscribe(&self, mut on_tick: Box<dyn FnMut() + Send>) -> ClockSubscription {
        let period = self.period;
        let handle = tokio::spawn(async move {
            let mut interval = time::interval(period);
            // A tick arriving late applies a single delta; it never catches
            // up by bursting.
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                on_tick();
            }
        });
        ClockSubscription::new(move || handle.abort())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    };

    #[tokio::test]
    async fn tokio_clock_delivers_ticks_until_cancelled() {
        let clock = TokioClock::new(Duration::from_millis(1));
        let count = Arc::new(AtomicU32::new(0));
        let counter = count.clone();

        let subscription = clock.subscribe(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        tokio::time::sleep(Duration::from_millis(50)).await;
        subscription.cancel();
        let seen = count.load(Ordering::SeqCst);
        assert!(seen > 0, "expected at least one tick, saw {seen}");

        tokio::time::sleep(Duration::from_millis(20)).await;
        // At most one in-flight callback may land after the abort.
        let after = count.load(Ordering::SeqCst);
        assert!(after <= seen + 1, "ticks kept arriving after cancel");
    }
}
