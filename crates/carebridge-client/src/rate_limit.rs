use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Rolling-window request throttle for one vendor session.
///
/// At most `max_requests` acquisitions may begin within any window of the
/// configured length. Acquisition is atomic: the slot check and the claim
/// happen under one lock, so concurrent callers can never share a unit of
/// capacity. Callers past the limit suspend until the oldest timestamp ages
/// out.
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            timestamps: Mutex::new(VecDeque::new()),
        }
    }

    /// Suspend until a request slot is available, then claim it.
    pub async fn check_limit(&self) {
        loop {
            let wait = {
                let mut stamps = self.timestamps.lock().await;
                let now = Instant::now();
                while stamps
                    .front()
                    .is_some_and(|oldest| now.duration_since(*oldest) >= self.window)
                {
                    stamps.pop_front();
                }
                if stamps.len() < self.max_requests {
                    stamps.push_back(now);
                    return;
                }
                match stamps.front() {
                    Some(oldest) => self.window.saturating_sub(now.duration_since(*oldest)),
                    None => self.window,
                }
            };
            let wait = wait.max(Duration::from_millis(1));
            tracing::debug!(wait_ms = wait.as_millis() as u64, "rate limit reached, waiting for a slot");
            tokio::time::sleep(wait).await;
        }
    }

    /// Slots currently free in the window. Point-in-time; informational only.
    pub async fn available(&self) -> usize {
        let mut stamps = self.timestamps.lock().await;
        let now = Instant::now();
        while stamps
            .front()
            .is_some_and(|oldest| now.duration_since(*oldest) >= self.window)
        {
            stamps.pop_front();
        }
        self.max_requests.saturating_sub(stamps.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_under_limit_never_waits() {
        let limiter = RateLimiter::new(3, Duration::from_secs(1));
        let start = Instant::now();
        for _ in 0..3 {
            limiter.check_limit().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.available().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocks_until_window_rolls() {
        let limiter = RateLimiter::new(2, Duration::from_secs(1));
        limiter.check_limit().await;
        limiter.check_limit().await;

        let start = Instant::now();
        limiter.check_limit().await;
        // third acquisition had to wait for the first slot to age out
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_frees_slots_after_gap() {
        let limiter = RateLimiter::new(2, Duration::from_secs(1));
        limiter.check_limit().await;
        limiter.check_limit().await;
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let start = Instant::now();
        limiter.check_limit().await;
        limiter.check_limit().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_burst_respects_window() {
        let max = 4usize;
        let window = Duration::from_secs(1);
        let limiter = Arc::new(RateLimiter::new(max, window));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                limiter.check_limit().await;
                Instant::now()
            }));
        }
        let mut acquired = Vec::new();
        for handle in handles {
            acquired.push(handle.await.unwrap());
        }
        acquired.sort();

        // no point in time sees more than `max` acquisitions inside one window
        for (i, t) in acquired.iter().enumerate() {
            let in_window = acquired[i..]
                .iter()
                .take_while(|other| other.duration_since(*t) < window)
                .count();
            assert!(
                in_window <= max,
                "{in_window} acquisitions started within one window"
            );
        }
    }
}
