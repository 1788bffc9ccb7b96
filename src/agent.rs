//! Cycle driver: fetch, decide, report, wait — until told to stop.

use tokio::sync::mpsc;

use crate::camera::ArmStateGateway;
use crate::cloud::{StatusMessage, StatusSink, StopCommand};
use crate::config::Config;
use crate::reconcile::{reconcile, Action, CycleOutcome};
use crate::router::{DiagnosticSource, RouterError};
use crate::station::{connected_addresses, parse_report};

/// The reconciliation loop over its three collaborators.
///
/// Generic over the collaborator traits so tests can drive cycles against
/// in-memory implementations. At most one cycle is in flight at a time.
pub struct Agent<R, G, S> {
    controlling_ips: Vec<String>,
    cycle_interval: std::time::Duration,
    report_timeout: std::time::Duration,
    router: R,
    camera: G,
    cloud: S,
}

impl<R, G, S> Agent<R, G, S>
where
    R: DiagnosticSource,
    G: ArmStateGateway,
    S: StatusSink,
{
    /// Create an agent from configuration and collaborators.
    pub fn new(config: &Config, router: R, camera: G, cloud: S) -> Self {
        Self {
            controlling_ips: config.controlling_ips.clone(),
            cycle_interval: config.cycle_interval,
            report_timeout: config.report_timeout,
            router,
            camera,
            cloud,
        }
    }

    /// Run cycles until a stop command arrives.
    ///
    /// The inter-cycle wait is raced against the stop channel; the stop
    /// command wins ties and always prevents the next fetch from starting.
    pub async fn run(&self, mut stop_rx: mpsc::Receiver<StopCommand>) {
        loop {
            tracing::info!("------ Starting new cycle");
            let outcome = self.run_cycle().await;
            self.report(&outcome).await;

            tracing::info!(
                "Waiting {} seconds (or a stop command)",
                self.cycle_interval.as_secs()
            );
            tokio::select! {
                biased;
                command = stop_rx.recv() => {
                    match command {
                        Some(command) => {
                            tracing::info!("Exiting due to stop command: {}", command.payload);
                        }
                        None => tracing::info!("Stop channel closed, exiting"),
                    }
                    return;
                }
                _ = tokio::time::sleep(self.cycle_interval) => {}
            }
        }
    }

    /// One fetch-and-decide pass.
    ///
    /// Arm state and presence are fetched concurrently with failures captured
    /// per fetch. The reconciler only runs when both are known good;
    /// otherwise the outcome carries the failure and no action.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let (armed, presence) = tokio::join!(self.camera.read_armed(), self.fetch_presence());

        match (armed, presence) {
            (Ok(armed), Ok(connected)) => {
                tracing::info!("Connected IPs: {connected:?}");
                tracing::info!("Armed status: {armed}");
                tracing::info!("Controlling IPs: {:?}", self.controlling_ips);

                let action =
                    reconcile(&self.camera, armed, &connected, &self.controlling_ips).await;

                CycleOutcome {
                    armed: Some(armed),
                    connected_addresses: connected,
                    action,
                    error: None,
                }
            }
            (armed, presence) => {
                let mut failures = Vec::new();
                if let Err(e) = &armed {
                    failures.push(format!("arm state read failed: {e}"));
                }
                if let Err(e) = &presence {
                    failures.push(format!("presence fetch failed: {e}"));
                }
                let error = failures.join("; ");
                tracing::error!("Cycle degraded, taking no action: {error}");

                CycleOutcome {
                    armed: armed.ok(),
                    connected_addresses: presence.unwrap_or_default(),
                    action: Action::None,
                    error: Some(error),
                }
            }
        }
    }

    /// Fetch the diagnostic report and derive the connected address set.
    async fn fetch_presence(&self) -> Result<Vec<String>, RouterError> {
        let raw = self.router.fetch_report().await?;
        let table = parse_report(&raw);
        Ok(connected_addresses(&table))
    }

    /// Transmit the cycle outcome under the report deadline.
    ///
    /// A deadline overrun or send failure is logged as a warning; the cycle
    /// proceeds either way.
    pub async fn report(&self, outcome: &CycleOutcome) {
        let message = StatusMessage::from_outcome(outcome);
        tracing::info!(
            "Sending message: {}",
            serde_json::to_string(&message).unwrap_or_default()
        );

        match tokio::time::timeout(self.report_timeout, self.cloud.send_status(&message)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Could not send status message: {e}"),
            Err(_) => tracing::warn!("Status report deadline exceeded, skipping"),
        }
    }
}
