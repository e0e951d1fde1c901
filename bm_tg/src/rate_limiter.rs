use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use teloxide::types::ChatId;
use tokio::sync::AcquireError;
use tokio::sync::Semaphore;

/// Messages per second across all chats
const GLOBAL_PER_SECOND: usize = 30;

/// Messages per second into one chat
const PER_CHAT_PER_SECOND: usize = 1;

/// Rate limiter enforcing Telegram API limits.
///
/// Each send consumes a permit for good; the refill task hands permits back once per second.
pub struct RateLimiter {
    global_limiter: Arc<Semaphore>,
    per_chat_limiters: Arc<DashMap<ChatId, Arc<Semaphore>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self { global_limiter: Arc::new(Semaphore::new(GLOBAL_PER_SECOND)), per_chat_limiters: Arc::new(DashMap::new()) }
    }

    /// Wait until one more message may go to `chat_id`
    pub async fn acquire(&self, chat_id: ChatId) -> Result<(), AcquireError> {
        self.global_limiter.acquire().await?.forget();

        let chat_limiter = self.per_chat_limiters.entry(chat_id).or_insert_with(|| Arc::new(Semaphore::new(PER_CHAT_PER_SECOND))).clone();
        chat_limiter.acquire_owned().await?.forget();
        Ok(())
    }

    /// Top every limiter back up to its per-second allowance
    pub fn refill(&self) {
        let available = self.global_limiter.available_permits();
        if available < GLOBAL_PER_SECOND {
            self.global_limiter.add_permits(GLOBAL_PER_SECOND - available);
        }
        for entry in self.per_chat_limiters.iter() {
            let semaphore = entry.value();
            let available = semaphore.available_permits();
            if available < PER_CHAT_PER_SECOND {
                semaphore.add_permits(PER_CHAT_PER_SECOND - available);
            }
        }
    }

    /// Start background task to refill permits
    pub fn start_refill_task(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                self.refill();
            }
        });
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
