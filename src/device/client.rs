use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use super::types::{NameBody, PidGains, ProfileValues, StatusSnapshot};
use super::DeviceApi;
use crate::config::PanelConfig;
use crate::error::PanelError;

const STATUS: &str = "/status";
const PROFILES: &str = "/profiles";
const LOAD_PROFILE: &str = "/loadprofile";
const SAVE_PROFILE: &str = "/saveprofile";
const DELETE_PROFILE: &str = "/deleteprofile";
const SET_VALUES: &str = "/setvalues";
const SET_PID_VALUES: &str = "/setPIDvalues";
const START: &str = "/start";
const STOP: &str = "/stop";

/// HTTP client for the oven controller's REST endpoints.
///
/// Cheap to clone; clones share the underlying connection pool. No request
/// timeout is applied unless `request_timeout_ms` is configured, so a hung
/// request stays pending until the network stack gives up.
#[derive(Debug, Clone)]
pub struct DeviceClient {
    client: reqwest::Client,
    base: Url,
}

impl DeviceClient {
    pub fn new(config: &PanelConfig) -> Result<Self, PanelError> {
        let base = config.device_url()?;

        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| PanelError::Config(format!("Failed to build HTTP client: {}", e)))?;

        info!("Device client targeting {}", base);
        Ok(Self { client, base })
    }

    fn endpoint(&self, path: &str) -> Result<Url, PanelError> {
        // Relative join keeps any path prefix on the base URL.
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| PanelError::Config(format!("Invalid endpoint '{}': {}", path, e)))
    }

    async fn send(&self, path: &str, request: RequestBuilder) -> Result<Response, PanelError> {
        let response = request
            .send()
            .await
            .map_err(|e| PanelError::Transport(format!("{}: {}", path, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PanelError::Device {
                endpoint: path.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, PanelError> {
        let url = self.endpoint(path)?;
        let response = self.send(path, self.client.get(url)).await?;
        response.json::<T>().await.map_err(|e| PanelError::Decode {
            endpoint: path.to_string(),
            message: e.to_string(),
        })
    }

    /// GET where only the status code matters.
    async fn get_ack(&self, path: &str) -> Result<(), PanelError> {
        let url = self.endpoint(path)?;
        self.send(path, self.client.get(url)).await?;
        debug!("{} acknowledged", path);
        Ok(())
    }

    async fn post_json<B>(&self, path: &str, body: &B) -> Result<(), PanelError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let url = self.endpoint(path)?;
        self.send(path, self.client.post(url).json(body)).await?;
        debug!("{} acknowledged", path);
        Ok(())
    }
}

impl DeviceApi for DeviceClient {
    async fn status(&self) -> Result<StatusSnapshot, PanelError> {
        self.get_json(STATUS).await
    }

    async fn list_profiles(&self) -> Result<Vec<String>, PanelError> {
        self.get_json(PROFILES).await
    }

    async fn load_profile(&self, file_name: &str) -> Result<(), PanelError> {
        self.post_json(LOAD_PROFILE, &NameBody { name: file_name }).await
    }

    async fn save_profile(&self, file_name: &str) -> Result<(), PanelError> {
        self.post_json(SAVE_PROFILE, &NameBody { name: file_name }).await
    }

    async fn delete_profile(&self, file_name: &str) -> Result<(), PanelError> {
        self.post_json(DELETE_PROFILE, &NameBody { name: file_name }).await
    }

    async fn set_values(&self, values: &ProfileValues) -> Result<(), PanelError> {
        self.post_json(SET_VALUES, values).await
    }

    async fn set_pid_values(&self, gains: &PidGains) -> Result<(), PanelError> {
        self.post_json(SET_PID_VALUES, gains).await
    }

    async fn start(&self) -> Result<(), PanelError> {
        self.get_ack(START).await
    }

    async fn stop(&self) -> Result<(), PanelError> {
        self.get_ack(STOP).await
    }
}
