// ABOUTME: Interactive console used while linking: line input, status output, cursor control.
// ABOUTME: TerminalConsole drives stdin/stdout; HiddenCursor restores the cursor on every exit path.

use async_trait::async_trait;
use crossterm::cursor::{Hide, Show};
use crossterm::execute;
use std::io::{self, BufRead, Write};
use std::ops::{Deref, DerefMut};
use tokio::sync::mpsc;
use tracing::warn;

/// The operator's console.
///
/// `read_line` must be cancel-safe: dropping its future before completion may
/// not lose a line that a later call would otherwise return.
#[async_trait]
pub trait Console: Send {
    /// Reads one line without its terminator. `None` once input is closed.
    async fn read_line(&mut self) -> io::Result<Option<String>>;

    /// Prints a block of status text followed by a newline.
    fn print(&mut self, text: &str);

    /// Prints `text` without a newline so the answer is typed on the same line.
    fn prompt(&mut self, text: &str);

    /// Draws one spinner frame in place.
    fn render_spinner(&mut self, frame: &str);

    fn hide_cursor(&mut self);

    fn show_cursor(&mut self);
}

/// Console bound to the process's stdin and stdout.
///
/// Stdin is read on a dedicated thread that forwards lines over a channel, so
/// an abandoned read never holds up shutdown.
pub struct TerminalConsole {
    lines: mpsc::UnboundedReceiver<io::Result<String>>,
}

impl TerminalConsole {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        let spawned = std::thread::Builder::new()
            .name("tether-stdin".to_string())
            .spawn(move || {
                for line in io::stdin().lock().lines() {
                    let failed = line.is_err();
                    if tx.send(line).is_err() || failed {
                        break;
                    }
                }
            });
        if let Err(e) = spawned {
            warn!(error = %e, "failed to start stdin reader, console input disabled");
        }

        Self { lines: rx }
    }
}

impl Default for TerminalConsole {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Console for TerminalConsole {
    async fn read_line(&mut self) -> io::Result<Option<String>> {
        self.lines.recv().await.transpose()
    }

    fn print(&mut self, text: &str) {
        println!("{text}");
    }

    fn prompt(&mut self, text: &str) {
        let mut stdout = io::stdout();
        let _ = write!(stdout, "{text}");
        let _ = stdout.flush();
    }

    fn render_spinner(&mut self, frame: &str) {
        let mut stdout = io::stdout();
        let _ = write!(stdout, "{frame}\r");
        let _ = stdout.flush();
    }

    fn hide_cursor(&mut self) {
        let _ = execute!(io::stdout(), Hide);
    }

    fn show_cursor(&mut self) {
        let _ = execute!(io::stdout(), Show);
    }
}

/// RAII guard that hides the cursor and shows it again when dropped.
pub struct HiddenCursor<'a> {
    console: &'a mut (dyn Console + 'a),
}

impl<'a> HiddenCursor<'a> {
    pub fn new(console: &'a mut (dyn Console + 'a)) -> Self {
        console.hide_cursor();
        Self { console }
    }
}

impl<'a> Deref for HiddenCursor<'a> {
    type Target = dyn Console + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.console
    }
}

impl DerefMut for HiddenCursor<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.console
    }
}

impl Drop for HiddenCursor<'_> {
    fn drop(&mut self) {
        self.console.show_cursor();
    }
}
