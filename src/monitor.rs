//! Async event loop that drives an [ApplicationTracker] from the outside world:
//! foreground-change and process-exit signals arrive on an mpsc channel, and a
//! fixed-interval tick refreshes the foreground application. Running both on one
//! task keeps every tracker mutation serialized, which the tracker requires.

use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{tracker::ApplicationTracker, utils::clock::Clock};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(60);

/// Signals delivered by the external OS-level collaborators.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// The foreground window moved to the application with this executable name.
    ForegroundChanged(String),
    /// The process behind this executable name exited; the entry stops tracking.
    ProcessExited(String),
}

pub struct MonitorModule {
    events: mpsc::Receiver<MonitorEvent>,
    tracker: ApplicationTracker,
    shutdown: CancellationToken,
    tick_interval: Duration,
    time_provider: Box<dyn Clock>,
}

impl MonitorModule {
    pub fn new(
        events: mpsc::Receiver<MonitorEvent>,
        tracker: ApplicationTracker,
        shutdown: CancellationToken,
        tick_interval: Duration,
        time_provider: Box<dyn Clock>,
    ) -> Self {
        Self {
            events,
            tracker,
            shutdown,
            tick_interval,
            time_provider,
        }
    }

    fn handle_event(&mut self, event: MonitorEvent) {
        match event {
            MonitorEvent::ForegroundChanged(name) => {
                debug!("Foreground moved to '{name}'");
                self.tracker.notify_foreground_changed(&name);
            }
            MonitorEvent::ProcessExited(name) => {
                info!("Process behind '{name}' exited");
                self.tracker.set_tracked(&name, false);
            }
        }
    }

    /// Executes the monitor event loop until cancellation or until every event
    /// sender is dropped. Returns the tracker so the integrator can persist its
    /// accumulated totals.
    pub async fn run(mut self) -> Result<ApplicationTracker> {
        let mut tick_point = self.time_provider.instant() + self.tick_interval;
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Monitor loop cancelled");
                    return Ok(self.tracker);
                }
                event = self.events.recv() => {
                    match event {
                        Some(event) => self.handle_event(event),
                        None => {
                            warn!("Every event source hung up, stopping the monitor loop");
                            return Ok(self.tracker);
                        }
                    }
                }
                _ = self.time_provider.sleep_until(tick_point) => {
                    tick_point += self.tick_interval;
                    if let Some(elapsed) = self.tracker.tick() {
                        debug!("Foreground total is now {elapsed}");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::Result;
    use chrono::TimeDelta;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use crate::{
        process::{MockProcessQuery, ProcessHandle},
        tracker::ApplicationTracker,
        utils::{clock::DefaultClock, logging::TEST_LOGGING},
    };

    use super::{MonitorEvent, MonitorModule};

    fn live_query() -> MockProcessQuery {
        let mut query = MockProcessQuery::new();
        query.expect_list_by_name().returning(|name| {
            vec![ProcessHandle {
                pid: 77,
                image_name: name.into(),
            }]
        });
        query.expect_product_name().returning(|_| None);
        query.expect_is_alive().returning(|_| true);
        query
    }

    /// End-to-end pass through the loop against real time: foreground signal in,
    /// periodic ticks accruing, cancellation handing the tracker back.
    #[tokio::test]
    async fn smoke_test_monitor_loop() -> Result<()> {
        *TEST_LOGGING;
        let mut tracker =
            ApplicationTracker::new(Box::new(live_query()), Box::new(DefaultClock));
        tracker.add("iperf3")?;
        tracker.set_tracked("iperf3", true);

        let (sender, receiver) = mpsc::channel(10);
        let shutdown = CancellationToken::new();
        let monitor = MonitorModule::new(
            receiver,
            tracker,
            shutdown.clone(),
            Duration::from_millis(20),
            Box::new(DefaultClock),
        );

        let (_, run_result) = tokio::join!(
            async {
                sender
                    .send(MonitorEvent::ForegroundChanged("iperf3".to_owned()))
                    .await
                    .unwrap();
                tokio::time::sleep(Duration::from_millis(200)).await;
                shutdown.cancel();
            },
            monitor.run(),
        );

        let tracker = run_result?;
        let elapsed = tracker.application("iperf3").unwrap().elapsed();
        assert!(elapsed > TimeDelta::zero(), "no time accrued: {elapsed}");
        assert!(elapsed < TimeDelta::seconds(2), "implausible total: {elapsed}");
        Ok(())
    }

    #[tokio::test]
    async fn exit_event_stops_tracking() -> Result<()> {
        *TEST_LOGGING;
        let mut tracker =
            ApplicationTracker::new(Box::new(live_query()), Box::new(DefaultClock));
        tracker.add("iperf3")?;
        tracker.set_tracked("iperf3", true);

        let (sender, receiver) = mpsc::channel(10);
        let shutdown = CancellationToken::new();
        let monitor = MonitorModule::new(
            receiver,
            tracker,
            shutdown.clone(),
            Duration::from_secs(3600),
            Box::new(DefaultClock),
        );

        let (_, run_result) = tokio::join!(
            async {
                sender
                    .send(MonitorEvent::ForegroundChanged("iperf3".to_owned()))
                    .await
                    .unwrap();
                sender
                    .send(MonitorEvent::ProcessExited("iperf3".to_owned()))
                    .await
                    .unwrap();
                // Dropping the sender ends the loop once the queue drains.
                drop(sender);
            },
            monitor.run(),
        );

        let tracker = run_result?;
        assert_eq!(tracker.foreground(), None);
        assert_eq!(tracker.untracked_names().collect::<Vec<_>>(), vec!["iperf3"]);
        Ok(())
    }
}
