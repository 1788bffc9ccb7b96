//! Monitoring endpoint client: outbound status reports and inbound commands.
//!
//! One status message is sent per cycle. An out-of-band stop command can
//! arrive at any time; a long-poll listener forwards it onto a channel that
//! the cycle driver races against its inter-cycle wait.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::config::MessagingConfig;
use crate::reconcile::CycleOutcome;
use crate::DEVICE_ID;

/// Delay before retrying a failed command poll.
const COMMAND_POLL_RETRY_SECS: u64 = 5;

/// Transmit one status message per cycle.
#[allow(async_fn_in_trait)]
pub trait StatusSink {
    /// Send a single status message.
    async fn send_status(&self, message: &StatusMessage) -> Result<(), CloudError>;
}

/// Cloud messaging error types.
#[derive(Debug)]
pub enum CloudError {
    /// Network/HTTP error
    Network(String),
    /// The endpoint rejected the message
    Server { status: u16, message: String },
}

impl std::fmt::Display for CloudError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloudError::Network(msg) => write!(f, "Cloud network error: {msg}"),
            CloudError::Server { status, message } => {
                write!(f, "Cloud server error ({status}): {message}")
            }
        }
    }
}

impl std::error::Error for CloudError {}

/// Per-cycle status report, JSON-encoded on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct StatusMessage {
    /// Constant 1
    pub active: u8,
    /// Constant device identifier
    pub device: &'static str,
    /// Seconds since epoch
    pub timestamp: f64,
    /// Armed state, or null when it could not be determined
    pub armed: Option<bool>,
    /// Connected addresses observed this cycle
    pub connected_ips: Vec<String>,
    /// Failure description, or null
    pub error: Option<String>,
    /// `""`, `"arm"`, or `"disarm"`
    pub action: &'static str,
}

impl StatusMessage {
    /// Build the wire message for a cycle outcome, timestamped now.
    pub fn from_outcome(outcome: &CycleOutcome) -> Self {
        Self {
            active: 1,
            device: DEVICE_ID,
            timestamp: chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0,
            armed: outcome.armed,
            connected_ips: outcome.connected_addresses.clone(),
            error: outcome.error.clone(),
            action: outcome.action.as_str(),
        }
    }
}

/// Out-of-band command instructing the agent to stop.
#[derive(Debug, Clone)]
pub struct StopCommand {
    /// Raw command payload, logged on receipt
    pub payload: String,
}

/// HTTP client for the monitoring endpoint.
#[derive(Clone)]
pub struct CloudClient {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

impl CloudClient {
    /// Create a client from messaging configuration.
    pub fn new(config: &MessagingConfig) -> Result<Self, CloudError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| CloudError::Network(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            token: config.token.clone(),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/devices/{}/messages", self.endpoint, DEVICE_ID)
    }

    fn commands_url(&self) -> String {
        format!("{}/devices/{}/commands", self.endpoint, DEVICE_ID)
    }

    /// Spawn a long-poll listener for out-of-band commands.
    ///
    /// The first command received is forwarded to `stop_tx` and the listener
    /// exits. Poll timeouts and transient errors are retried after a short
    /// delay.
    pub fn spawn_command_listener(&self, stop_tx: mpsc::Sender<StopCommand>) {
        let client = self.clone();
        tokio::spawn(async move {
            loop {
                match client.poll_command().await {
                    Ok(Some(payload)) => {
                        let _ = stop_tx.send(StopCommand { payload }).await;
                        return;
                    }
                    Ok(None) => {
                        // Poll window elapsed with no command pending.
                    }
                    Err(e) => {
                        tracing::warn!("Command poll failed, retrying: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(
                            COMMAND_POLL_RETRY_SECS,
                        ))
                        .await;
                    }
                }
            }
        });
    }

    /// One long-poll round. `Ok(None)` means the window elapsed command-free.
    async fn poll_command(&self) -> Result<Option<String>, CloudError> {
        let response = self
            .client
            .get(self.commands_url())
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await
            .map_err(|e| CloudError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CloudError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let payload = response
            .text()
            .await
            .map_err(|e| CloudError::Network(e.to_string()))?;
        Ok(Some(payload))
    }
}

impl StatusSink for CloudClient {
    async fn send_status(&self, message: &StatusMessage) -> Result<(), CloudError> {
        let response = self
            .client
            .post(self.messages_url())
            .header("Authorization", format!("Bearer {}", self.token))
            .json(message)
            .send()
            .await
            .map_err(|e| CloudError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CloudError::Server {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}
