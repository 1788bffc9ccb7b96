//! autoarm - presence-based arming agent for a home camera security system.
//!
//! Every cycle the agent fetches the camera system's armed state and the
//! router's diagnostic report concurrently, derives which configured
//! "controlling" devices (occupants' phones) are on the network, arms or
//! disarms the camera system accordingly, and reports the outcome to a
//! monitoring endpoint. An out-of-band stop command ends the loop.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                          autoarm                           │
//! ├────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐    ┌──────────┐    ┌────────────┐            │
//! │  │  Router  │───▶│  Parser  │───▶│  Presence  │──┐         │
//! │  │  (dump)  │    │ (blocks) │    │ (ip set)   │  │         │
//! │  └──────────┘    └──────────┘    └────────────┘  ▼         │
//! │  ┌──────────┐                            ┌────────────┐    │
//! │  │  Camera  │───────────(armed?)────────▶│ Reconciler │    │
//! │  │  cloud   │◀──────────(arm/disarm)─────│            │    │
//! │  └──────────┘                            └────────────┘    │
//! │                                                 │          │
//! │  ┌──────────┐                                   ▼          │
//! │  │  Cloud   │◀─────────(status report)──── cycle driver    │
//! │  │ endpoint │──────────(stop command)────▶                 │
//! │  └──────────┘                                              │
//! └────────────────────────────────────────────────────────────┘
//! ```

pub mod agent;
pub mod camera;
pub mod cloud;
pub mod config;
pub mod reconcile;
pub mod router;
pub mod station;

// Re-export key types at crate root for convenience
pub use agent::Agent;
pub use camera::{ArmStateGateway, CameraClient, CameraError};
pub use cloud::{CloudClient, CloudError, StatusMessage, StatusSink, StopCommand};
pub use config::{Config, ConfigError, MessagingConfig};
pub use reconcile::{reconcile, Action, CycleOutcome};
pub use router::{DiagnosticSource, RouterClient, RouterError};
pub use station::{connected_addresses, fully_connected_hostnames, parse_report, StationTable};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Identifier this agent reports itself as to the monitoring endpoint.
pub const DEVICE_ID: &str = "RaspberryPiAutoArm";
