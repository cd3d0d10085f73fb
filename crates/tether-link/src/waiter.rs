// ABOUTME: Interruptible wait with a spinner, racing discovery completion against operator input
// ABOUTME: Whichever of completion, an input line, or an interrupt comes first decides the outcome

use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::console::{Console, HiddenCursor};

/// Spinner redraw interval.
pub const TICK: Duration = Duration::from_millis(100);

const MIN_TICK: Duration = Duration::from_millis(1);

const SPINNER_FRAMES: &[&str] = &["|", "/", "-", "\\"];

/// Why a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The awaited work completed on its own.
    Elapsed,
    /// The operator entered a line.
    Cancelled,
    /// The process was interrupted.
    Interrupted,
}

/// Waits on the console for either external completion or operator input.
///
/// Once console input reports end-of-file (or fails) it is ignored for the
/// rest of the waiter's life and only completion or interrupt can end a wait.
#[derive(Debug)]
pub struct CancellableWaiter {
    tick: Duration,
    input_open: bool,
}

impl Default for CancellableWaiter {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellableWaiter {
    pub fn new() -> Self {
        Self::with_tick(TICK)
    }

    /// Spinner interval, clamped to at least one millisecond.
    pub fn with_tick(tick: Duration) -> Self {
        Self {
            tick: tick.max(MIN_TICK),
            input_open: true,
        }
    }

    /// Whether console input can still cancel a wait.
    pub fn input_open(&self) -> bool {
        self.input_open
    }

    /// Spins until `finished` resolves, a line is read, or `interrupt` fires.
    /// The cursor is hidden for the duration and restored on every exit path.
    pub async fn wait<F>(
        &mut self,
        console: &mut dyn Console,
        finished: F,
        interrupt: &CancellationToken,
    ) -> WaitOutcome
    where
        F: Future<Output = ()>,
    {
        let mut console = HiddenCursor::new(console);
        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(finished);
        let mut frame = 0;

        loop {
            tokio::select! {
                biased;
                _ = interrupt.cancelled() => return WaitOutcome::Interrupted,
                _ = &mut finished => return WaitOutcome::Elapsed,
                line = console.read_line(), if self.input_open => match line {
                    Ok(Some(_)) => return WaitOutcome::Cancelled,
                    Ok(None) => {
                        debug!("console input closed, waiting for completion only");
                        self.input_open = false;
                    }
                    Err(e) => {
                        warn!(error = %e, "console read failed, waiting for completion only");
                        self.input_open = false;
                    }
                },
                _ = ticker.tick() => {
                    console.render_spinner(SPINNER_FRAMES[frame]);
                    frame = (frame + 1) % SPINNER_FRAMES.len();
                }
            }
        }
    }
}
