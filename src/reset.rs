//! Out-of-band reset and termination handling.
//!
//! OS signals are translated into [`Trigger`]s by a forwarding task and
//! consumed by the [`ResetListener`], which runs next to the poll loop for
//! the whole life of the process.
//!
//! ```text
//!   SIGUSR1 ──────────┐                       ┌──▶ SharedIndicator::reset
//!   SIGTERM/SIGINT ───┼──▶ trigger channel ──▶│
//!                     │      (1 slot)         └──▶ return (process exits)
//! ```

use crate::indicator::SharedIndicator;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Something the reset listener reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Zero the counter and publish immediately
    Reset,
    /// Stop listening so the process can exit
    Terminate,
}

/// Why the listener stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerExit {
    /// A termination trigger was received
    Terminated,
    /// Every trigger sender was dropped
    Closed,
}

/// Create the trigger channel.
///
/// It holds a single pending trigger; further resets arriving before it is
/// consumed are dropped.
pub fn trigger_channel() -> (mpsc::Sender<Trigger>, mpsc::Receiver<Trigger>) {
    mpsc::channel(1)
}

/// Waits for triggers and applies them to the shared indicator.
pub struct ResetListener {
    indicator: Arc<SharedIndicator>,
    triggers: mpsc::Receiver<Trigger>,
    pause: Duration,
    resets: u64,
}

impl ResetListener {
    pub fn new(
        indicator: Arc<SharedIndicator>,
        triggers: mpsc::Receiver<Trigger>,
        pause: Duration,
    ) -> Self {
        Self {
            indicator,
            triggers,
            pause,
            resets: 0,
        }
    }

    /// Handle triggers until termination.
    pub async fn run(mut self) -> ListenerExit {
        info!("Reset listener started");

        while let Some(trigger) = self.triggers.recv().await {
            match trigger {
                Trigger::Reset => {
                    let update = self.indicator.reset(Instant::now());
                    self.resets += 1;
                    debug!(resets = self.resets, count = update.payload.count, "Reset applied");
                }
                Trigger::Terminate => {
                    info!(resets = self.resets, "Termination requested");
                    return ListenerExit::Terminated;
                }
            }

            tokio::time::sleep(self.pause).await;
        }

        info!(resets = self.resets, "Trigger channel closed");
        ListenerExit::Closed
    }
}

/// Translate process signals into triggers.
///
/// `SIGUSR1` resets; `SIGTERM` and `SIGINT` terminate. Must be called from
/// within a tokio runtime.
#[cfg(unix)]
pub fn forward_signals(triggers: mpsc::Sender<Trigger>) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut reset = signal(SignalKind::user_defined1())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;

    Ok(tokio::spawn(async move {
        loop {
            let trigger = tokio::select! {
                Some(()) = reset.recv() => Trigger::Reset,
                Some(()) = terminate.recv() => Trigger::Terminate,
                Some(()) = interrupt.recv() => Trigger::Terminate,
                else => break,
            };
            debug!(?trigger, "Signal received");

            if !deliver(&triggers, trigger).await {
                break;
            }
        }
    }))
}

/// Translate Ctrl-C into a termination trigger.
#[cfg(not(unix))]
pub fn forward_signals(triggers: mpsc::Sender<Trigger>) -> std::io::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if !deliver(&triggers, Trigger::Terminate).await {
                break;
            }
        }
    }))
}

/// Queue `trigger`. Resets are dropped when one is already pending;
/// termination waits for room. Returns `false` once the listener is gone.
async fn deliver(triggers: &mpsc::Sender<Trigger>, trigger: Trigger) -> bool {
    use tokio::sync::mpsc::error::TrySendError;

    match trigger {
        Trigger::Reset => match triggers.try_send(trigger) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!("Reset already pending, dropping signal");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        },
        Trigger::Terminate => triggers.send(trigger).await.is_ok(),
    }
}
