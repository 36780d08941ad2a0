use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Time source for the tracking core. All wall-clock reads and tick scheduling go
/// through this trait, so tests can substitute a controlled clock.
#[async_trait]
pub trait Clock: Sync + Send + 'static {
    /// Current wall-clock moment, used for elapsed-time accounting.
    fn time(&self) -> DateTime<Utc>;

    /// Monotonic reference point for tick scheduling.
    fn instant(&self) -> Instant;

    async fn sleep_until(&self, instant: Instant);
}

pub struct DefaultClock;

#[async_trait]
impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, instant: Instant) {
        tokio::time::sleep_until(instant).await;
    }
}
