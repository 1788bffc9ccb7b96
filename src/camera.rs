//! Arm-state gateway for the camera system.
//!
//! The camera cloud owns the armed flag; this module only reads it and flips
//! it. Writes are fire-and-forget: there is no read-after-write verification.

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Base URL of the camera cloud API.
const CAMERA_API_BASE_URL: &str = "https://rest.camera-cloud.example.net";

/// Read and write the armed state of one camera network.
#[allow(async_fn_in_trait)]
pub trait ArmStateGateway {
    /// Read the current armed state. May fail.
    async fn read_armed(&self) -> Result<bool, CameraError>;

    /// Set the armed state. Fire-and-forget from the caller's perspective.
    async fn set_armed(&self, armed: bool) -> Result<(), CameraError>;
}

/// Camera gateway error types.
#[derive(Debug)]
pub enum CameraError {
    /// Network/HTTP error
    Network(String),
    /// The cloud rejected a request
    Server { status: u16, message: String },
    /// Unusable response body
    Decode(String),
}

impl std::fmt::Display for CameraError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraError::Network(msg) => write!(f, "Camera network error: {msg}"),
            CameraError::Server { status, message } => {
                write!(f, "Camera server error ({status}): {message}")
            }
            CameraError::Decode(msg) => write!(f, "Camera decode error: {msg}"),
        }
    }
}

impl std::error::Error for CameraError {}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Deserialize)]
struct NetworkStatus {
    armed: bool,
}

/// HTTP client for the camera cloud.
pub struct CameraClient {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    network: String,
    /// Session token, obtained lazily on first use
    token: RwLock<Option<String>>,
}

impl CameraClient {
    /// Create a client for the given account and network.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        network: impl Into<String>,
    ) -> Result<Self, CameraError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| CameraError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: CAMERA_API_BASE_URL.to_string(),
            username: username.into(),
            password: password.into(),
            network: network.into(),
            token: RwLock::new(None),
        })
    }

    /// Return a session token, logging in if none is cached.
    async fn session_token(&self) -> Result<String, CameraError> {
        if let Some(token) = self.token.read().await.clone() {
            return Ok(token);
        }

        tracing::info!("Logging in to camera cloud");
        let response = self
            .client
            .post(format!("{}/api/v1/login", self.base_url))
            .json(&LoginRequest {
                username: &self.username,
                password: &self.password,
            })
            .send()
            .await
            .map_err(|e| CameraError::Network(e.to_string()))?;

        let response = check_status(response).await?;
        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| CameraError::Decode(e.to_string()))?;

        *self.token.write().await = Some(login.token.clone());
        Ok(login.token)
    }
}

impl ArmStateGateway for CameraClient {
    async fn read_armed(&self) -> Result<bool, CameraError> {
        let token = self.session_token().await?;

        let response = self
            .client
            .get(format!(
                "{}/api/v1/networks/{}",
                self.base_url, self.network
            ))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .map_err(|e| CameraError::Network(e.to_string()))?;

        let response = check_status(response).await?;
        let status: NetworkStatus = response
            .json()
            .await
            .map_err(|e| CameraError::Decode(e.to_string()))?;
        Ok(status.armed)
    }

    async fn set_armed(&self, armed: bool) -> Result<(), CameraError> {
        let token = self.session_token().await?;
        let verb = if armed { "arm" } else { "disarm" };

        tracing::info!(network = %self.network, "Changing camera arming status to {armed}");
        let response = self
            .client
            .post(format!(
                "{}/api/v1/networks/{}/{}",
                self.base_url, self.network, verb
            ))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .map_err(|e| CameraError::Network(e.to_string()))?;

        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, CameraError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(CameraError::Server {
        status: status.as_u16(),
        message,
    })
}
