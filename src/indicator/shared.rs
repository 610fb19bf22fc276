//! Indicator state shared between the poll loop and the reset listener.
//!
//! One mutex guards the counter and the last published payload, and the
//! sink is called while it is held, so the file always reflects the
//! latest state change.

use crate::config::ResetPolicy;
use crate::indicator::render::{RenderedPayload, Renderer};
use crate::indicator::state::IndicatorState;
use crate::output::OutputSink;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of one state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    /// Payload rendered after the change
    pub payload: RenderedPayload,
    /// Whether the sink was invoked
    pub published: bool,
}

#[derive(Debug)]
struct Inner {
    state: IndicatorState,
    last_published: Option<RenderedPayload>,
}

/// Thread-safe indicator: state, renderer and output sink behind one lock.
pub struct SharedIndicator {
    inner: Mutex<Inner>,
    renderer: Renderer,
    sink: Arc<dyn OutputSink>,
    reset_policy: ResetPolicy,
    echo: bool,
}

impl SharedIndicator {
    pub fn new(
        state: IndicatorState,
        renderer: Renderer,
        sink: Arc<dyn OutputSink>,
        reset_policy: ResetPolicy,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state,
                last_published: None,
            }),
            renderer,
            sink,
            reset_policy,
            echo: false,
        }
    }

    /// Also print every rendered payload to stdout.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Feed a debounced sample and publish if the payload changed.
    pub fn observe(&self, detected: bool, now: Instant) -> Update {
        let mut inner = self.lock();
        let changed = inner.state.observe_presence(detected, now);
        if changed {
            debug!(count = inner.state.count(), detected, "Eye count changed");
        }

        let payload = self.render(&inner);
        let published = if inner.last_published.as_ref() != Some(&payload) {
            self.publish(&payload);
            inner.last_published = Some(payload.clone());
            true
        } else {
            false
        };

        Update { payload, published }
    }

    /// Zero the counter and publish regardless of the previous payload.
    pub fn reset(&self, now: Instant) -> Update {
        let mut inner = self.lock();
        let previous = inner.state.count();
        inner.state.reset_with_policy(self.reset_policy, now);
        info!(previous, policy = ?self.reset_policy, "Eye count reset");

        let payload = self.render(&inner);
        self.publish(&payload);
        inner.last_published = Some(payload.clone());

        Update {
            payload,
            published: true,
        }
    }

    pub fn count(&self) -> u32 {
        self.lock().state.count()
    }

    /// The payload most recently handed to the sink.
    pub fn last_published(&self) -> Option<RenderedPayload> {
        self.lock().last_published.clone()
    }

    fn render(&self, inner: &Inner) -> RenderedPayload {
        let payload = self.renderer.render(&inner.state);
        if self.echo {
            match payload.to_json() {
                Ok(json) => println!("{json}"),
                Err(e) => warn!(error = %e, "Could not serialize payload"),
            }
        }
        payload
    }

    /// Failures are logged only; the snapshot is updated by the caller either way.
    fn publish(&self, payload: &RenderedPayload) {
        match self.sink.publish(payload) {
            Ok(()) => debug!(count = payload.count, class = %payload.class, "Payload published"),
            Err(e) => warn!(error = %e, "Could not publish payload"),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{MemorySink, OutputError};
    use std::time::Duration;

    const COOLDOWN: Duration = Duration::from_secs(60);

    struct FailingSink;

    impl OutputSink for FailingSink {
        fn publish(&self, _payload: &RenderedPayload) -> Result<(), OutputError> {
            Err(OutputError::Io(std::io::Error::other("disk full")))
        }
    }

    fn indicator(sink: Arc<dyn OutputSink>, policy: ResetPolicy) -> (SharedIndicator, Instant) {
        let origin = Instant::now();
        let state = IndicatorState::new(5, COOLDOWN, origin);
        (
            SharedIndicator::new(state, Renderer::new("e"), sink, policy),
            origin + COOLDOWN,
        )
    }

    #[test]
    fn test_first_observation_publishes() {
        let sink = Arc::new(MemorySink::new());
        let (shared, t0) = indicator(sink.clone(), ResetPolicy::KeepCooldown);

        let update = shared.observe(false, t0);
        assert!(update.published);
        assert_eq!(sink.published().len(), 1);
        assert_eq!(sink.published()[0].count, 0);
    }

    #[test]
    fn test_unchanged_payload_is_not_republished() {
        let sink = Arc::new(MemorySink::new());
        let (shared, t0) = indicator(sink.clone(), ResetPolicy::KeepCooldown);

        shared.observe(false, t0);
        let update = shared.observe(false, t0 + Duration::from_secs(1));
        assert!(!update.published);
        assert_eq!(sink.published().len(), 1);

        let update = shared.observe(true, t0 + Duration::from_secs(2));
        assert!(update.published);
        assert_eq!(update.payload.count, 1);
        assert_eq!(sink.published().len(), 2);
    }

    #[test]
    fn test_reset_always_publishes() {
        let sink = Arc::new(MemorySink::new());
        let (shared, t0) = indicator(sink.clone(), ResetPolicy::KeepCooldown);

        shared.observe(false, t0);
        let update = shared.reset(t0);
        assert!(update.published);
        assert_eq!(update.payload.count, 0);

        let published = sink.published();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0], published[1]);
    }

    #[test]
    fn test_reset_from_three_publishes_zero() {
        let sink = Arc::new(MemorySink::new());
        let (shared, t0) = indicator(sink.clone(), ResetPolicy::KeepCooldown);

        for i in 0..3 {
            shared.observe(true, t0 + COOLDOWN * i);
        }
        assert_eq!(shared.count(), 3);

        let update = shared.reset(t0 + COOLDOWN * 3);
        assert_eq!(update.payload.count, 0);
        assert_eq!(shared.count(), 0);
        assert_eq!(shared.last_published(), Some(update.payload));
    }

    #[test]
    fn test_failed_publish_still_updates_snapshot() {
        let (shared, t0) = indicator(Arc::new(FailingSink), ResetPolicy::KeepCooldown);

        let first = shared.observe(false, t0);
        assert!(first.published);
        assert_eq!(shared.last_published(), Some(first.payload));

        let second = shared.observe(false, t0 + Duration::from_secs(1));
        assert!(!second.published);
    }

    #[test]
    fn test_concurrent_resets_and_observations_stay_consistent() {
        let sink = Arc::new(MemorySink::new());
        let (shared, t0) = indicator(sink.clone(), ResetPolicy::KeepCooldown);
        let shared = Arc::new(shared);

        let poller = {
            let shared = Arc::clone(&shared);
            std::thread::spawn(move || {
                for i in 0..500u32 {
                    shared.observe(i % 3 != 0, t0 + COOLDOWN * i);
                }
            })
        };
        let resetter = {
            let shared = Arc::clone(&shared);
            std::thread::spawn(move || {
                for _ in 0..100 {
                    shared.reset(t0);
                }
            })
        };

        poller.join().unwrap();
        resetter.join().unwrap();

        assert!(shared.count() <= 5);
        for payload in sink.published() {
            assert!(payload.count <= 5);
            assert_eq!(payload.text.len(), payload.count as usize);
        }
    }
}
