//! The poll loop: sample, update, publish, sleep.

use crate::config::Config;
use crate::detector::{Debouncer, PresenceSource, Sample};
use crate::indicator::{SharedIndicator, Update};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Poll cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerTiming {
    /// Delay in steady state, and before the first poll
    pub sleep_on_presence: Duration,
    /// Delay while the counter is decaying
    pub sleep_on_absence: Duration,
    /// Skip the warm-up delay before the first poll
    pub fast_start: bool,
}

impl SchedulerTiming {
    pub fn from_config(config: &Config) -> Self {
        Self {
            sleep_on_presence: config.sleep_on_presence,
            sleep_on_absence: config.sleep_on_absence,
            fast_start: config.fast_start || config.debug,
        }
    }

    /// Poll faster while eyes are disappearing so the bar catches up quickly.
    pub fn next_sleep(&self, present: bool, count: u32) -> Duration {
        if !present && count > 0 {
            self.sleep_on_absence
        } else {
            self.sleep_on_presence
        }
    }
}

/// What happened during one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tick {
    pub sample: Sample,
    pub update: Update,
    pub next_sleep: Duration,
}

/// Drives the detector and feeds the shared indicator.
pub struct Scheduler<S> {
    debouncer: Debouncer<S>,
    indicator: Arc<SharedIndicator>,
    timing: SchedulerTiming,
    shutdown: Receiver<()>,
    total_ticks: u64,
}

impl<S: PresenceSource> Scheduler<S> {
    pub fn new(
        debouncer: Debouncer<S>,
        indicator: Arc<SharedIndicator>,
        timing: SchedulerTiming,
        shutdown: Receiver<()>,
    ) -> Self {
        Self {
            debouncer,
            indicator,
            timing,
            shutdown,
            total_ticks: 0,
        }
    }

    /// Take one debounced sample and apply it.
    pub fn tick(&mut self) -> Tick {
        let sample = self.debouncer.sample();
        self.apply(sample, Instant::now())
    }

    /// Apply an already taken sample as of `now`.
    pub fn apply(&mut self, sample: Sample, now: Instant) -> Tick {
        let update = self.indicator.observe(sample.present, now);
        let next_sleep = self.timing.next_sleep(sample.present, update.payload.count);
        self.total_ticks += 1;

        debug!(
            present = sample.present,
            faces = sample.face_count,
            count = update.payload.count,
            published = update.published,
            next_sleep_secs = next_sleep.as_secs(),
            "Poll complete"
        );

        Tick {
            sample,
            update,
            next_sleep,
        }
    }

    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// Poll until shutdown is requested. Returns the number of polls taken.
    pub fn run(mut self) -> u64 {
        info!(
            fast_start = self.timing.fast_start,
            sleep_on_presence_secs = self.timing.sleep_on_presence.as_secs(),
            sleep_on_absence_secs = self.timing.sleep_on_absence.as_secs(),
            "Scheduler started"
        );

        // Give the camera time to settle before trusting its frames.
        if !self.timing.fast_start && self.wait(self.timing.sleep_on_presence) {
            info!("Scheduler stopped before first poll");
            return self.total_ticks;
        }

        loop {
            let tick = self.tick();
            if self.wait(tick.next_sleep) {
                break;
            }
        }

        info!(ticks = self.total_ticks, "Scheduler stopped");
        self.total_ticks
    }

    /// Sleep for `duration`. Returns `true` if shutdown was requested meanwhile.
    fn wait(&self, duration: Duration) -> bool {
        match self.shutdown.recv_timeout(duration) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
            Err(RecvTimeoutError::Timeout) => false,
        }
    }
}

impl<S: PresenceSource + 'static> Scheduler<S> {
    /// Run the loop on its own thread, since detection blocks.
    pub fn spawn(self) -> std::io::Result<JoinHandle<u64>> {
        thread::Builder::new()
            .name("scheduler".to_string())
            .spawn(move || self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResetPolicy;
    use crate::detector::ScriptedSource;
    use crate::indicator::{IndicatorState, Renderer};
    use crate::output::MemorySink;
    use crossbeam_channel::bounded;

    const COOLDOWN: Duration = Duration::from_secs(60);

    fn timing() -> SchedulerTiming {
        SchedulerTiming {
            sleep_on_presence: Duration::from_secs(30),
            sleep_on_absence: Duration::from_secs(15),
            fast_start: true,
        }
    }

    fn present() -> Sample {
        Sample {
            face_count: 1,
            present: true,
        }
    }

    #[test]
    fn test_next_sleep_selection() {
        let timing = timing();
        assert_eq!(timing.next_sleep(false, 2), Duration::from_secs(15));
        assert_eq!(timing.next_sleep(false, 0), Duration::from_secs(30));
        assert_eq!(timing.next_sleep(true, 0), Duration::from_secs(30));
        assert_eq!(timing.next_sleep(true, 5), Duration::from_secs(30));
    }

    #[test]
    fn test_debug_implies_fast_start() {
        let mut config = Config::default();
        assert!(!SchedulerTiming::from_config(&config).fast_start);
        config.debug = true;
        assert!(SchedulerTiming::from_config(&config).fast_start);
    }

    #[test]
    fn test_apply_gates_publishing() {
        let origin = Instant::now();
        let sink = Arc::new(MemorySink::new());
        let indicator = Arc::new(SharedIndicator::new(
            IndicatorState::new(5, COOLDOWN, origin),
            Renderer::default(),
            sink.clone(),
            ResetPolicy::KeepCooldown,
        ));
        let (_tx, rx) = bounded(1);
        let debouncer = Debouncer::new(ScriptedSource::new(vec![]), 1, Duration::ZERO);
        let mut scheduler = Scheduler::new(debouncer, indicator, timing(), rx);

        let t0 = origin + COOLDOWN;
        let tick = scheduler.apply(present(), t0);
        assert!(tick.update.published);
        assert_eq!(tick.update.payload.count, 1);
        assert_eq!(tick.next_sleep, Duration::from_secs(30));

        let tick = scheduler.apply(present(), t0 + Duration::from_secs(1));
        assert!(!tick.update.published);

        let tick = scheduler.apply(Sample::absent(), t0 + Duration::from_secs(2));
        assert!(tick.update.published);
        assert_eq!(tick.update.payload.count, 0);
        assert_eq!(tick.next_sleep, Duration::from_secs(30));

        assert_eq!(sink.published().len(), 2);
        assert_eq!(scheduler.total_ticks(), 3);
    }

    #[test]
    fn test_run_stops_on_shutdown() {
        let origin = Instant::now();
        let sink = Arc::new(MemorySink::new());
        let indicator = Arc::new(SharedIndicator::new(
            IndicatorState::new(5, COOLDOWN, origin),
            Renderer::default(),
            sink.clone(),
            ResetPolicy::KeepCooldown,
        ));
        let (tx, rx) = bounded(1);
        let source = ScriptedSource::repeating(Ok(crate::detector::Detection::from_faces(1)));
        let debouncer = Debouncer::new(source, 1, Duration::ZERO);
        let timing = SchedulerTiming {
            sleep_on_presence: Duration::from_millis(10),
            sleep_on_absence: Duration::from_millis(10),
            fast_start: true,
        };

        let handle = Scheduler::new(debouncer, Arc::clone(&indicator), timing, rx)
            .spawn()
            .unwrap();
        std::thread::sleep(Duration::from_millis(50));
        tx.send(()).unwrap();
        assert!(handle.join().unwrap() >= 1);

        // Presence inside the first cool-down: polled, published once, never grown.
        assert_eq!(indicator.count(), 0);
        assert_eq!(sink.published().len(), 1);
    }

    fn warm_up_scheduler(
        sleep_on_presence: Duration,
    ) -> (Scheduler<ScriptedSource>, Arc<MemorySink>, crossbeam_channel::Sender<()>) {
        let sink = Arc::new(MemorySink::new());
        let indicator = Arc::new(SharedIndicator::new(
            IndicatorState::new(5, COOLDOWN, Instant::now()),
            Renderer::default(),
            sink.clone(),
            ResetPolicy::KeepCooldown,
        ));
        let (tx, rx) = bounded(1);
        let source = ScriptedSource::repeating(Ok(crate::detector::Detection::from_faces(1)));
        let timing = SchedulerTiming {
            sleep_on_presence,
            sleep_on_absence: sleep_on_presence,
            fast_start: false,
        };
        let scheduler = Scheduler::new(
            Debouncer::new(source, 1, Duration::ZERO),
            indicator,
            timing,
            rx,
        );
        (scheduler, sink, tx)
    }

    #[test]
    fn test_first_poll_waits_for_warm_up() {
        let (scheduler, sink, tx) = warm_up_scheduler(Duration::from_millis(300));
        let started = Instant::now();
        let handle = scheduler.spawn().unwrap();

        std::thread::sleep(Duration::from_millis(100));
        assert!(sink.published().is_empty());

        let deadline = started + Duration::from_secs(5);
        while sink.published().is_empty() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(sink.published().len(), 1);
        assert!(started.elapsed() >= Duration::from_millis(300));

        tx.send(()).unwrap();
        assert!(handle.join().unwrap() >= 1);
    }

    #[test]
    fn test_shutdown_during_warm_up_skips_polling() {
        let (scheduler, sink, tx) = warm_up_scheduler(Duration::from_secs(30));
        let handle = scheduler.spawn().unwrap();

        tx.send(()).unwrap();
        assert_eq!(handle.join().unwrap(), 0);
        assert!(sink.published().is_empty());
    }
}
