pub mod client;
pub mod types;

use std::future::Future;

pub use client::DeviceClient;
pub use types::{PhaseFlags, PidGains, ProfileIdentity, ProfileValues, StatusSnapshot, PROFILE_SUFFIX};

use crate::error::PanelError;

/// REST surface of the reflow controller.
///
/// Implemented over HTTP by [`DeviceClient`]; tests substitute an in-memory
/// device. Profile names passed in are full file names (with suffix).
pub trait DeviceApi: Clone + Send + Sync + 'static {
    /// `GET /status`
    fn status(&self) -> impl Future<Output = Result<StatusSnapshot, PanelError>> + Send;

    /// `GET /profiles`
    fn list_profiles(&self) -> impl Future<Output = Result<Vec<String>, PanelError>> + Send;

    /// `POST /loadprofile`
    fn load_profile(&self, file_name: &str) -> impl Future<Output = Result<(), PanelError>> + Send;

    /// `POST /saveprofile`
    fn save_profile(&self, file_name: &str) -> impl Future<Output = Result<(), PanelError>> + Send;

    /// `POST /deleteprofile`
    fn delete_profile(&self, file_name: &str)
        -> impl Future<Output = Result<(), PanelError>> + Send;

    /// `POST /setvalues`
    fn set_values(&self, values: &ProfileValues)
        -> impl Future<Output = Result<(), PanelError>> + Send;

    /// `POST /setPIDvalues`
    fn set_pid_values(&self, gains: &PidGains)
        -> impl Future<Output = Result<(), PanelError>> + Send;

    /// `GET /start`
    fn start(&self) -> impl Future<Output = Result<(), PanelError>> + Send;

    /// `GET /stop`
    fn stop(&self) -> impl Future<Output = Result<(), PanelError>> + Send;
}
