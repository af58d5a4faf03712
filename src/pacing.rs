//! Minimum-interval pacing for rate-limited collaborators.
//!
//! The summarization API and the batch driver both need a fixed gap between
//! consecutive calls. [`Pacer`] owns that policy so the pipeline only has to
//! call [`Pacer::wait`] before each rate-limited step.

use std::time::Duration;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

/// Enforces a minimum interval between consecutive calls.
///
/// The first [`wait`](Pacer::wait) returns immediately. Later calls sleep
/// for whatever remains of the interval since the previous call returned.
#[derive(Debug)]
pub struct Pacer {
    name: &'static str,
    interval: Duration,
    last: Option<Instant>,
}

impl Pacer {
    pub fn new(name: &'static str, interval: Duration) -> Self {
        Self {
            name,
            interval,
            last: None,
        }
    }

    /// Wait until the next call is allowed, then mark it as taken.
    pub async fn wait(&mut self) {
        // Deadlines past the clock's range skip pacing.
        if let Some(ready_at) = self.last.and_then(|last| last.checked_add(self.interval)) {
            if ready_at > Instant::now() {
                let delay = ready_at.saturating_duration_since(Instant::now());
                debug!(pacer = self.name, delay_ms = delay.as_millis() as u64, "Pacing");
                sleep_until(ready_at).await;
            }
        }
        self.last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_wait_is_immediate() {
        let mut pacer = Pacer::new("test", Duration::from_secs(2));
        let t0 = Instant::now();
        pacer.wait().await;
        assert_eq!(t0.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_wait_sleeps_for_interval() {
        let mut pacer = Pacer::new("test", Duration::from_secs(2));
        pacer.wait().await;
        let t0 = Instant::now();
        pacer.wait().await;
        assert!(t0.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_work_counts_toward_interval() {
        let mut pacer = Pacer::new("test", Duration::from_secs(3));
        pacer.wait().await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        let t0 = Instant::now();
        pacer.wait().await;
        assert_eq!(t0.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_never_sleeps() {
        let mut zero = Pacer::new("zero", Duration::ZERO);
        let t0 = Instant::now();
        for _ in 0..3 {
            zero.wait().await;
        }
        assert_eq!(t0.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_interval_does_not_overflow() {
        let mut pacer = Pacer::new("huge", Duration::MAX);
        pacer.wait().await;
        let t0 = Instant::now();
        pacer.wait().await;
        assert_eq!(t0.elapsed(), Duration::ZERO);
    }
}
