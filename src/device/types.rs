use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PanelError;

/// Suffix the device uses for stored profile files.
pub const PROFILE_SUFFIX: &str = ".json";

/// Temperature/time setpoints for the four reflow phases.
/// Temperatures are in Celsius, times in whole seconds.
///
/// Key names match the device's JSON (`preheatTemp`, `soakTime`, ...). Missing
/// keys fall back to the firmware's power-on defaults.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileValues {
    pub preheat_temp: f64,
    pub preheat_time: u32,
    pub soak_temp: f64,
    pub soak_time: u32,
    pub reflow_temp: f64,
    pub reflow_time: u32,
    pub cooldown_temp: f64,
    pub cooldown_time: u32,
}

impl Default for ProfileValues {
    fn default() -> Self {
        Self {
            preheat_temp: 100.0,
            preheat_time: 120,
            soak_temp: 150.0,
            soak_time: 60,
            reflow_temp: 230.0,
            reflow_time: 120,
            cooldown_temp: 25.0,
            cooldown_time: 120,
        }
    }
}

impl ProfileValues {
    /// Reject values the device cannot store. Times are whole seconds by
    /// construction, so only the temperatures need checking.
    pub fn validate(&self) -> Result<(), PanelError> {
        let temps = [
            ("preheat-temp", self.preheat_temp),
            ("soak-temp", self.soak_temp),
            ("reflow-temp", self.reflow_temp),
            ("cooling-temp", self.cooldown_temp),
        ];
        for (field, value) in temps {
            if !value.is_finite() {
                return Err(PanelError::Validation(format!(
                    "{} must be a number, got {}",
                    field, value
                )));
            }
        }
        Ok(())
    }

    /// Total programmed cycle length.
    pub fn total_time(&self) -> Duration {
        let secs = self.preheat_time as u64
            + self.soak_time as u64
            + self.reflow_time as u64
            + self.cooldown_time as u64;
        Duration::from_secs(secs)
    }
}

/// PID controller gains.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 2.0,
            ki: 5.0,
            kd: 1.0,
        }
    }
}

impl PidGains {
    pub fn validate(&self) -> Result<(), PanelError> {
        for (field, value) in [("kp", self.kp), ("ki", self.ki), ("kd", self.kd)] {
            if !value.is_finite() {
                return Err(PanelError::Validation(format!(
                    "{} must be a number, got {}",
                    field, value
                )));
            }
        }
        Ok(())
    }
}

/// Name of a stored profile, without the file suffix.
///
/// The device lists and reports profiles by file name (`lead-free.json`);
/// identities compare equal whether or not the suffix was present.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileIdentity(String);

impl ProfileIdentity {
    /// Normalize a profile name. Returns `None` for blank names.
    pub fn new(name: &str) -> Option<Self> {
        let trimmed = name.trim();
        let bare = trimmed.strip_suffix(PROFILE_SUFFIX).unwrap_or(trimmed).trim();
        if bare.is_empty() {
            None
        } else {
            Some(Self(bare.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name as stored on the device.
    pub fn file_name(&self) -> String {
        format!("{}{}", self.0, PROFILE_SUFFIX)
    }
}

impl fmt::Display for ProfileIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Phase flags as reported by the firmware. More than one may be set if the
/// firmware misbehaves; display priority is handled by
/// [`crate::reconcile::compute_display_status`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseFlags {
    pub preheating: bool,
    pub soaking: bool,
    pub reflowing: bool,
    pub cooling_down: bool,
}

/// One point-in-time read of `GET /status`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "StatusWire")]
pub struct StatusSnapshot {
    pub running: bool,
    pub phases: PhaseFlags,
    pub current_temperature: f64,
    pub setpoint: f64,
    pub pid_output: f64,
    pub active_profile: Option<ProfileIdentity>,
    pub profile: ProfileValues,
    pub gains: PidGains,
    pub elapsed: Duration,
}

impl StatusSnapshot {
    /// PID output above this is shown as "heater on". A display heuristic,
    /// not something the firmware guarantees.
    pub const HEATER_ON_THRESHOLD: f64 = 0.5;

    pub fn heater_on(&self) -> bool {
        self.pid_output > Self::HEATER_ON_THRESHOLD
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusWire {
    #[serde(default)]
    start: bool,
    #[serde(default)]
    preheating: bool,
    #[serde(default)]
    soaking: bool,
    #[serde(default)]
    reflowing: bool,
    #[serde(default)]
    cooling_down: bool,
    #[serde(default)]
    last_temperature: f64,
    #[serde(default)]
    setpoint: f64,
    #[serde(default)]
    pid_output: f64,
    #[serde(default)]
    current_profile: Option<String>,
    #[serde(default)]
    time: f64,
    #[serde(flatten)]
    profile: ProfileValues,
    #[serde(flatten)]
    gains: PidGains,
}

impl From<StatusWire> for StatusSnapshot {
    fn from(wire: StatusWire) -> Self {
        let elapsed = if wire.time.is_finite() && wire.time > 0.0 {
            Duration::from_secs_f64(wire.time)
        } else {
            Duration::ZERO
        };

        Self {
            running: wire.start,
            phases: PhaseFlags {
                preheating: wire.preheating,
                soaking: wire.soaking,
                reflowing: wire.reflowing,
                cooling_down: wire.cooling_down,
            },
            current_temperature: wire.last_temperature,
            setpoint: wire.setpoint,
            pid_output: wire.pid_output,
            active_profile: wire.current_profile.as_deref().and_then(ProfileIdentity::new),
            profile: wire.profile,
            gains: wire.gains,
            elapsed,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct NameBody<'a> {
    pub name: &'a str,
}
