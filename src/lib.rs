pub mod config;
pub mod console;
pub mod device;
pub mod dispatch;
mod error;
pub mod panel;
pub mod poller;
pub mod reconcile;

pub use config::PanelConfig;
pub use device::{DeviceApi, DeviceClient, PidGains, ProfileIdentity, ProfileValues, StatusSnapshot};
pub use dispatch::{ActionKind, ActionState, Dispatcher};
pub use error::PanelError;
pub use panel::{Action, Command, Notice, Panel, PanelView};
pub use reconcile::{compute_display_status, DraftField, Phase, Reconciler};

/// Log to stderr so the console's own output stays readable. `RUST_LOG`
/// overrides the default `info` level.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
