//! Polite pacing between listing pages.
//!
//! The crawl visits one page at a time; after a page yields a next link the
//! controller sleeps for the configured delay (plus optional jitter) before
//! loading it, and after each content wait it pauses briefly so late
//! scripts can finish rendering.

use std::time::Duration;

/// Delay policy applied by the crawl controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolitenessConfig {
    /// Pause between consecutive page loads.
    pub delay: Duration,

    /// Maximum random jitter added on top of `delay` (uniform [0, jitter)).
    ///
    /// Set to `Duration::ZERO` to disable.
    pub jitter: Duration,
}

impl PolitenessConfig {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            jitter: Duration::ZERO,
        }
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// No pauses at all. For tests and fixture-driven runs.
    pub fn none() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Delay plus random jitter for a single wait.
    fn effective_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.delay;
        }
        let jitter_ms = rand_jitter_ms(self.jitter.as_millis() as u64);
        self.delay + Duration::from_millis(jitter_ms)
    }

    /// Half the base delay, without jitter.
    pub fn settle_delay(&self) -> Duration {
        self.delay / 2
    }

    /// Sleep before loading the next page.
    pub async fn wait_between_pages(&self) {
        let delay = self.effective_delay();
        if delay.is_zero() {
            return;
        }
        tracing::debug!(delay_ms = %delay.as_millis(), "Waiting before next page");
        tokio::time::sleep(delay).await;
    }

    /// Short pause after the content wait, before reading the HTML.
    pub async fn settle(&self) {
        let delay = self.settle_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for PolitenessConfig {
    /// 3 seconds between pages, no jitter.
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}

// xorshift seeded from the clock. Only used for jitter.
fn rand_jitter_ms(max_ms: u64) -> u64 {
    if max_ms == 0 {
        return 0;
    }
    let mut x = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x % max_ms
}
