// ABOUTME: Link orchestration: already-linked check, discovery race, manual verification-code loop
// ABOUTME: Converges every session on one terminal LinkOutcome

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ConfigStore;
use crate::console::Console;
use crate::discovery::{DiscoveryHandle, DiscoveryListener};
use crate::error::{LinkError, Result, VerifyError};
use crate::messages;
use crate::session::{DiscoveryState, LinkOutcome, LinkSession};
use crate::verify::{normalize_code, VerificationClient};
use crate::waiter::{CancellableWaiter, WaitOutcome};

/// How long discovery may run before the manual code is offered.
pub const DISCOVERY_BUDGET: Duration = Duration::from_secs(300);

/// Codes tried per run in debug mode before giving up.
pub const MAX_DEBUG_ATTEMPTS: usize = 5;

/// Where the manual step gets its verification code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeSource {
    /// Ask on the console.
    Prompt,
    /// Read a code imported out-of-band into a file.
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct LinkOptions {
    /// Print diagnostics and retry rejected codes instead of exiting
    pub debug: bool,
    pub discovery_budget: Duration,
    /// Command line printed after a failed code, so the user can retry with debug output
    pub rerun_command: String,
    pub code_source: CodeSource,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            debug: false,
            discovery_budget: DISCOVERY_BUDGET,
            rerun_command: messages::rerun_command(Vec::<String>::new()),
            code_source: CodeSource::Prompt,
        }
    }
}

enum RaceEnd {
    Settled,
    Interrupted,
}

/// Drives one link session from start to a terminal outcome.
pub struct LinkOrchestrator {
    store: Arc<dyn ConfigStore>,
    discovery: Arc<dyn DiscoveryListener>,
    verifier: Arc<dyn VerificationClient>,
    console: Box<dyn Console>,
    options: LinkOptions,
    interrupt: CancellationToken,
    waiter: CancellableWaiter,
}

impl LinkOrchestrator {
    pub fn new(
        store: Arc<dyn ConfigStore>,
        discovery: Arc<dyn DiscoveryListener>,
        verifier: Arc<dyn VerificationClient>,
        console: Box<dyn Console>,
        options: LinkOptions,
    ) -> Self {
        Self {
            store,
            discovery,
            verifier,
            console,
            options,
            interrupt: CancellationToken::new(),
            waiter: CancellableWaiter::new(),
        }
    }

    /// Token that aborts the session when cancelled (wired to Ctrl-C by the binary).
    pub fn with_interrupt(mut self, interrupt: CancellationToken) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn with_waiter(mut self, waiter: CancellableWaiter) -> Self {
        self.waiter = waiter;
        self
    }

    pub async fn run(mut self) -> Result<LinkOutcome> {
        let initial = self.store.reload()?;
        let mut session = LinkSession::new(initial.has_token);

        if session.already_linked() {
            info!("config already holds a token, skipping discovery");
            self.console.print(&messages::already_linked_warning());
        } else {
            self.console.print(messages::DISCOVERY_INTRO);
            if let RaceEnd::Interrupted = self.race_discovery(&mut session).await? {
                return Ok(session.finish(LinkOutcome::Interrupted));
            }
        }

        // Discovery's worker has exited, so anything it saved is on disk by now.
        let snapshot = self.store.reload()?;
        // A token only counts as gained by discovery if discovery ran.
        if session.discovery() == DiscoveryState::Stopped {
            if snapshot.has_token {
                info!("linked through discovery");
                self.console.print(&messages::linked_banner());
                return Ok(session.finish(LinkOutcome::Linked));
            }
            info!(
                declined_auto = session.declined_auto(),
                "discovery ended without a link"
            );
            self.console.print(messages::SWITCHED_TO_MANUAL);
        }

        let outcome = self.manual_loop(&mut session).await?;
        Ok(session.finish(outcome))
    }

    /// Runs discovery against the operator until one side settles, then
    /// stops discovery and waits for its worker to exit.
    async fn race_discovery(&mut self, session: &mut LinkSession) -> Result<RaceEnd> {
        let mut handle =
            DiscoveryHandle::spawn(Arc::clone(&self.discovery), self.options.discovery_budget);
        session.discovery_started();

        let result = self.wait_or_switch(&handle, session).await;

        handle.stop_and_join().await;
        session.discovery_stopped();
        result
    }

    async fn wait_or_switch(
        &mut self,
        handle: &DiscoveryHandle,
        session: &mut LinkSession,
    ) -> Result<RaceEnd> {
        loop {
            let outcome = self
                .waiter
                .wait(&mut *self.console, handle.finished(), &self.interrupt)
                .await;

            match outcome {
                WaitOutcome::Elapsed => {
                    debug!("discovery returned before the operator switched");
                    return Ok(RaceEnd::Settled);
                }
                WaitOutcome::Interrupted => return Ok(RaceEnd::Interrupted),
                WaitOutcome::Cancelled => {}
            }

            self.console.prompt(messages::SWITCH_PROMPT);
            let answer = match self.read_line().await {
                Err(LinkError::Interrupted) => return Ok(RaceEnd::Interrupted),
                other => other?,
            };

            if confirms_switch(answer.as_deref()) {
                info!("operator switched to the verification code");
                session.switch_to_manual();
                return Ok(RaceEnd::Settled);
            }
            self.console.print(messages::CONTINUE_WAITING);
        }
    }

    async fn manual_loop(&mut self, session: &mut LinkSession) -> Result<LinkOutcome> {
        session.enter_manual();
        debug!(mode = ?session.mode(), "asking for a verification code");
        self.console.print(messages::MANUAL_INTRO);

        let mut attempts = 0;
        loop {
            attempts += 1;

            let raw = match self.obtain_code().await {
                Err(LinkError::Interrupted) => return Ok(LinkOutcome::Interrupted),
                other => other?,
            };
            let code = match normalize_code(&raw) {
                Ok(code) => code.to_string(),
                Err(e) => {
                    warn!("no verification code supplied");
                    self.console.print(&e.to_string());
                    return Ok(LinkOutcome::NoCode);
                }
            };

            if self.options.debug {
                self.console.print(&format!(
                    "## DEBUG: Verifying code \"{code}\" at server URL: \"{}\"",
                    self.verifier.endpoint()
                ));
            }

            let result = tokio::select! {
                biased;
                _ = self.interrupt.cancelled() => return Ok(LinkOutcome::Interrupted),
                result = self.verifier.submit(&code) => result,
            };

            let err = match result {
                Ok(()) => {
                    info!(attempt = attempts, "linked with verification code");
                    self.console.print(&messages::linked_banner());
                    return Ok(LinkOutcome::Linked);
                }
                Err(e) => e,
            };

            warn!(error = %err, attempt = attempts, "verification failed");
            self.console.print(&messages::failed_banner());

            if !self.options.debug {
                self.console
                    .print(&messages::rerun_hint(&self.options.rerun_command));
                return Ok(LinkOutcome::Failed);
            }

            if let VerifyError::Rejected { status, .. } = &err {
                self.console
                    .print(&format!("## DEBUG: Server response code \"{status}\""));
            }
            self.console.print(&format!("## DEBUG: {err}"));
            if attempts >= MAX_DEBUG_ATTEMPTS {
                self.console.print(&format!(
                    "Giving up after {MAX_DEBUG_ATTEMPTS} attempts."
                ));
                return Ok(LinkOutcome::Failed);
            }
        }
    }

    /// Reads one untrusted line for the code. Unreadable sources yield an empty code.
    async fn obtain_code(&mut self) -> Result<String> {
        match self.options.code_source.clone() {
            CodeSource::Prompt => {
                self.console.prompt(messages::CODE_PROMPT);
                Ok(self.read_line().await?.unwrap_or_default())
            }
            CodeSource::File(path) => match tokio::fs::read_to_string(&path).await {
                Ok(code) => Ok(code),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "could not read code file");
                    self.console.print(&messages::code_file_missing(&path));
                    Ok(String::new())
                }
            },
        }
    }

    async fn read_line(&mut self) -> Result<Option<String>> {
        tokio::select! {
            biased;
            _ = self.interrupt.cancelled() => Err(LinkError::Interrupted),
            line = self.console.read_line() => Ok(line?),
        }
    }
}

/// Anything but an explicit "n" confirms the switch to the verification code.
fn confirms_switch(answer: Option<&str>) -> bool {
    !matches!(answer.map(str::trim), Some("n" | "N"))
}
