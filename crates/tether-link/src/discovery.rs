// ABOUTME: Discovery listener lifecycle and the server-polling discovery implementation
// ABOUTME: DiscoveryHandle runs a listener on a worker task with a one-shot completion signal

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::verify::VerificationClient;

const DISCOVERY_PATH: &str = "/api/v1/octo/printer_discovery/";
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Automatic pairing with the companion app.
///
/// A successful run persists the account token as a side effect; callers learn
/// about it by reloading the config store.
#[async_trait]
pub trait DiscoveryListener: Send + Sync {
    /// Runs until linked, until `budget` elapses, or until `stop` is called.
    async fn start_and_block(&self, budget: Duration) -> Result<()>;

    /// Makes a running `start_and_block` return promptly. Idempotent.
    fn stop(&self);
}

/// A listener running on its own task.
pub struct DiscoveryHandle {
    listener: Arc<dyn DiscoveryListener>,
    done: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl DiscoveryHandle {
    pub fn spawn(listener: Arc<dyn DiscoveryListener>, budget: Duration) -> Self {
        let done = CancellationToken::new();
        let worker = Arc::clone(&listener);
        let finished = done.clone();

        let task = tokio::spawn(async move {
            // Fires even if the listener panics.
            let _finished = finished.drop_guard();
            match worker.start_and_block(budget).await {
                Ok(()) => debug!("discovery returned"),
                Err(e) => warn!(error = %e, "discovery ended with an error"),
            }
        });

        Self {
            listener,
            done,
            task: Some(task),
        }
    }

    /// True until the listener has returned.
    pub fn is_active(&self) -> bool {
        !self.done.is_cancelled()
    }

    /// Resolves once the listener has returned. May be awaited repeatedly.
    pub async fn finished(&self) {
        self.done.cancelled().await;
    }

    /// Stops the listener and waits for its task to exit.
    /// Only the first call does anything.
    pub async fn stop_and_join(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        self.listener.stop();
        if let Err(e) = task.await {
            warn!(error = %e, "discovery worker did not exit cleanly");
        }
    }
}

impl Drop for DiscoveryHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.listener.stop();
        }
    }
}

#[derive(Deserialize)]
struct DiscoveryResponse {
    #[serde(default)]
    one_time_passcode: Option<String>,
}

/// Discovery by announcing the device to the server until the companion app
/// claims it. The server then hands back a one-time passcode, which is
/// redeemed through the verification client.
pub struct ServerDiscovery {
    client: reqwest::Client,
    endpoint: String,
    device_name: String,
    verifier: Arc<dyn VerificationClient>,
    stop: CancellationToken,
    poll_interval: Duration,
}

impl ServerDiscovery {
    pub fn new(config: &LinkConfig, verifier: Arc<dyn VerificationClient>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(LinkError::HttpClient)?;

        Ok(Self {
            client,
            endpoint: config.endpoint()?.to_string(),
            device_name: config.device_name(),
            verifier,
            stop: CancellationToken::new(),
            poll_interval: POLL_INTERVAL,
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Redeems a passcode the server handed out. The server consumes the
    /// passcode on the first request, so this always runs to completion.
    async fn redeem(&self, passcode: &str) -> bool {
        info!("companion app claimed this device");
        match self.verifier.submit(passcode).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "discovery passcode was not accepted");
                false
            }
        }
    }

    async fn poll(&self) -> std::result::Result<Option<String>, reqwest::Error> {
        let resp = self
            .client
            .post(format!("{}{}", self.endpoint, DISCOVERY_PATH))
            .json(&serde_json::json!({
                "device_name": self.device_name,
                "agent": env!("CARGO_PKG_NAME"),
                "agent_version": env!("CARGO_PKG_VERSION"),
            }))
            .send()
            .await?
            .error_for_status()?;

        let body: DiscoveryResponse = resp.json().await?;
        Ok(body.one_time_passcode.filter(|c| !c.trim().is_empty()))
    }
}

#[async_trait]
impl DiscoveryListener for ServerDiscovery {
    async fn start_and_block(&self, budget: Duration) -> Result<()> {
        let deadline = tokio::time::sleep(budget);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;
                _ = self.stop.cancelled() => {
                    debug!("discovery stopped");
                    return Ok(());
                }
                _ = &mut deadline => {
                    info!(budget_secs = budget.as_secs(), "discovery budget elapsed");
                    return Ok(());
                }
                polled = self.poll() => match polled {
                    Ok(Some(passcode)) => {
                        // Not raced against stop: the passcode is already spent.
                        if self.redeem(&passcode).await {
                            info!("linked through discovery");
                            return Ok(());
                        }
                    }
                    Ok(None) => {}
                    Err(e) => debug!(error = %e, "discovery poll failed"),
                },
            }

            tokio::select! {
                biased;
                _ = self.stop.cancelled() => return Ok(()),
                _ = &mut deadline => return Ok(()),
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    fn stop(&self) {
        self.stop.cancel();
    }
}
