//! In-memory stand-in for the oven controller.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reflowpanel::device::PhaseFlags;
use reflowpanel::{DeviceApi, PanelError, PidGains, ProfileIdentity, ProfileValues, StatusSnapshot};

pub fn idle_status() -> StatusSnapshot {
    StatusSnapshot {
        running: false,
        phases: PhaseFlags::default(),
        current_temperature: 23.5,
        setpoint: 25.0,
        pid_output: 0.0,
        active_profile: ProfileIdentity::new("default.json"),
        profile: ProfileValues::default(),
        gains: PidGains::default(),
        elapsed: Duration::ZERO,
    }
}

pub struct FakeState {
    pub status: StatusSnapshot,
    pub stored: BTreeMap<String, (ProfileValues, PidGains)>,
    pub calls: Vec<String>,
    pub fail_status: bool,
    pub fail_writes: bool,
    pub status_delay: Option<Duration>,
    pub write_delay: Option<Duration>,
    status_active: usize,
    pub max_status_active: usize,
}

#[derive(Clone)]
pub struct FakeDevice {
    state: Arc<Mutex<FakeState>>,
}

impl FakeDevice {
    pub fn new() -> Self {
        let mut stored = BTreeMap::new();
        stored.insert(
            "default.json".to_string(),
            (ProfileValues::default(), PidGains::default()),
        );
        Self {
            state: Arc::new(Mutex::new(FakeState {
                status: idle_status(),
                stored,
                calls: Vec::new(),
                fail_status: false,
                fail_writes: false,
                status_delay: None,
                write_delay: None,
                status_active: 0,
                max_status_active: 0,
            })),
        }
    }

    pub fn with_profile(self, file_name: &str, values: ProfileValues, gains: PidGains) -> Self {
        self.state
            .lock()
            .unwrap()
            .stored
            .insert(file_name.to_string(), (values, gains));
        self
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn count(&self, call: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.as_str() == call)
            .count()
    }

    pub fn stored_names(&self) -> Vec<String> {
        self.state.lock().unwrap().stored.keys().cloned().collect()
    }

    pub fn max_concurrent_status(&self) -> usize {
        self.state.lock().unwrap().max_status_active
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }

    /// Record a write and decide whether it fails. The lock is released
    /// before any delay so the returned future stays `Send`.
    async fn begin_write(&self, call: String) -> Result<(), PanelError> {
        let (delay, fail) = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(call.clone());
            (state.write_delay, state.fail_writes)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(PanelError::Device {
                endpoint: call,
                status: 500,
            });
        }
        Ok(())
    }
}

impl DeviceApi for FakeDevice {
    async fn status(&self) -> Result<StatusSnapshot, PanelError> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.calls.push("GET /status".to_string());
            state.status_active += 1;
            state.max_status_active = state.max_status_active.max(state.status_active);
            state.status_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state.status_active -= 1;
        if state.fail_status {
            Err(PanelError::Transport("/status: connection refused".to_string()))
        } else {
            Ok(state.status.clone())
        }
    }

    async fn list_profiles(&self) -> Result<Vec<String>, PanelError> {
        self.record("GET /profiles".to_string());
        Ok(self.stored_names())
    }

    async fn load_profile(&self, file_name: &str) -> Result<(), PanelError> {
        self.begin_write(format!("POST /loadprofile {}", file_name)).await?;
        let mut state = self.state.lock().unwrap();
        let Some((values, gains)) = state.stored.get(file_name).copied() else {
            return Err(PanelError::Device {
                endpoint: "/loadprofile".to_string(),
                status: 404,
            });
        };
        state.status.profile = values;
        state.status.gains = gains;
        state.status.active_profile = ProfileIdentity::new(file_name);
        Ok(())
    }

    async fn save_profile(&self, file_name: &str) -> Result<(), PanelError> {
        self.begin_write(format!("POST /saveprofile {}", file_name)).await?;
        let mut state = self.state.lock().unwrap();
        let entry = (state.status.profile, state.status.gains);
        state.stored.insert(file_name.to_string(), entry);
        state.status.active_profile = ProfileIdentity::new(file_name);
        Ok(())
    }

    async fn delete_profile(&self, file_name: &str) -> Result<(), PanelError> {
        self.begin_write(format!("POST /deleteprofile {}", file_name)).await?;
        let mut state = self.state.lock().unwrap();
        if state.stored.remove(file_name).is_none() {
            return Err(PanelError::Device {
                endpoint: "/deleteprofile".to_string(),
                status: 404,
            });
        }
        Ok(())
    }

    async fn set_values(&self, values: &ProfileValues) -> Result<(), PanelError> {
        self.begin_write("POST /setvalues".to_string()).await?;
        self.state.lock().unwrap().status.profile = *values;
        Ok(())
    }

    async fn set_pid_values(&self, gains: &PidGains) -> Result<(), PanelError> {
        self.begin_write("POST /setPIDvalues".to_string()).await?;
        self.state.lock().unwrap().status.gains = *gains;
        Ok(())
    }

    async fn start(&self) -> Result<(), PanelError> {
        self.begin_write("GET /start".to_string()).await?;
        let mut state = self.state.lock().unwrap();
        state.status.running = true;
        state.status.phases = PhaseFlags {
            preheating: true,
            ..PhaseFlags::default()
        };
        Ok(())
    }

    async fn stop(&self) -> Result<(), PanelError> {
        self.begin_write("GET /stop".to_string()).await?;
        let mut state = self.state.lock().unwrap();
        state.status.running = false;
        state.status.phases = PhaseFlags::default();
        Ok(())
    }
}
