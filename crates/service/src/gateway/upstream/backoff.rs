use async_trait::async_trait;
use std::time::Duration;

pub(crate) const DEFAULT_MAX_RETRIES: u32 = 4;
pub(crate) const DEFAULT_INITIAL_RETRY_DELAY_MS: u64 = 2_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_RETRY_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
        }
    }

    /// Pause before retry number `attempt + 1`: `initial_delay * 2^attempt`, no jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let Some(nanos) = 1_u128
            .checked_shl(attempt)
            .and_then(|multiplier| self.initial_delay.as_nanos().checked_mul(multiplier))
        else {
            return Duration::MAX;
        };
        match u64::try_from(nanos / NANOS_PER_SEC) {
            Ok(secs) => Duration::new(secs, (nanos % NANOS_PER_SEC) as u32),
            Err(_) => Duration::MAX,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Suspends the current invocation between attempts.
#[async_trait]
pub trait BackoffPause: Send + Sync {
    async fn pause(&self, delay: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioPause;

#[async_trait]
impl BackoffPause for TokioPause {
    async fn pause(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_doubles_from_two_seconds() {
        let policy = RetryPolicy::default();
        let delays: Vec<u128> = (0..policy.max_retries)
            .map(|attempt| policy.delay_for(attempt).as_millis())
            .collect();
        assert_eq!(delays, vec![2_000, 4_000, 8_000, 16_000]);
        assert_eq!(policy.max_attempts(), 5);
    }

    #[test]
    fn delay_saturates_instead_of_overflowing() {
        let policy = RetryPolicy::new(64, Duration::from_secs(u64::MAX / 2));
        assert_eq!(policy.delay_for(40), Duration::MAX);
    }

    #[test]
    fn delay_keeps_doubling_past_32_retries() {
        let policy = RetryPolicy::new(64, Duration::from_nanos(1));
        assert_eq!(policy.delay_for(32), Duration::from_nanos(1 << 32));
        assert_eq!(policy.delay_for(40), Duration::from_nanos(1 << 40));
        assert_eq!(policy.delay_for(33) * 2, policy.delay_for(34));
        assert_eq!(policy.delay_for(200), Duration::MAX);
    }

    #[test]
    fn tokio_pause_waits_for_the_delay() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        let started = std::time::Instant::now();
        runtime.block_on(TokioPause.pause(Duration::from_millis(20)));
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
