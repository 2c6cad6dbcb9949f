use std::fmt;
use std::str::FromStr;

use crate::device::{PidGains, ProfileValues};
use crate::error::PanelError;

/// Independently edited and applied groups of draft fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldGroup {
    Profile,
    Pid,
}

/// One editable input on the settings form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DraftField {
    PreheatTemp,
    PreheatTime,
    SoakTemp,
    SoakTime,
    ReflowTemp,
    ReflowTime,
    CooldownTemp,
    CooldownTime,
    Kp,
    Ki,
    Kd,
}

impl DraftField {
    pub const ALL: [DraftField; 11] = [
        DraftField::PreheatTemp,
        DraftField::PreheatTime,
        DraftField::SoakTemp,
        DraftField::SoakTime,
        DraftField::ReflowTemp,
        DraftField::ReflowTime,
        DraftField::CooldownTemp,
        DraftField::CooldownTime,
        DraftField::Kp,
        DraftField::Ki,
        DraftField::Kd,
    ];

    pub fn key(self) -> &'static str {
        match self {
            DraftField::PreheatTemp => "preheat-temp",
            DraftField::PreheatTime => "preheat-time",
            DraftField::SoakTemp => "soak-temp",
            DraftField::SoakTime => "soak-time",
            DraftField::ReflowTemp => "reflow-temp",
            DraftField::ReflowTime => "reflow-time",
            DraftField::CooldownTemp => "cooling-temp",
            DraftField::CooldownTime => "cooling-time",
            DraftField::Kp => "kp",
            DraftField::Ki => "ki",
            DraftField::Kd => "kd",
        }
    }

    pub fn group(self) -> FieldGroup {
        match self {
            DraftField::Kp | DraftField::Ki | DraftField::Kd => FieldGroup::Pid,
            _ => FieldGroup::Profile,
        }
    }

    fn is_time(self) -> bool {
        matches!(
            self,
            DraftField::PreheatTime
                | DraftField::SoakTime
                | DraftField::ReflowTime
                | DraftField::CooldownTime
        )
    }
}

impl fmt::Display for DraftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for DraftField {
    type Err = PanelError;

    /// Accepts `preheat-temp`, `preheat_temp`, and `cooldown-*` as an alias
    /// for `cooling-*`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        let normalized = normalized.replace("cooldown-", "cooling-");
        DraftField::ALL
            .into_iter()
            .find(|f| f.key() == normalized)
            .ok_or_else(|| PanelError::Validation(format!("Unknown field '{}'", s.trim())))
    }
}

/// The operator's editable copy of a profile plus PID gains.
///
/// Values are readable by anyone; writes go through
/// [`crate::reconcile::Reconciler`] so the dirty flags stay truthful.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormDraft {
    values: ProfileValues,
    gains: PidGains,
    profile_dirty: bool,
    pid_dirty: bool,
}

impl FormDraft {
    pub fn values(&self) -> &ProfileValues {
        &self.values
    }

    pub fn gains(&self) -> &PidGains {
        &self.gains
    }

    pub fn is_dirty(&self) -> bool {
        self.profile_dirty || self.pid_dirty
    }

    pub fn is_group_dirty(&self, group: FieldGroup) -> bool {
        match group {
            FieldGroup::Profile => self.profile_dirty,
            FieldGroup::Pid => self.pid_dirty,
        }
    }

    /// Current value of a field as the form would show it.
    pub fn display_value(&self, field: DraftField) -> String {
        let v = &self.values;
        let g = &self.gains;
        match field {
            DraftField::PreheatTemp => v.preheat_temp.to_string(),
            DraftField::PreheatTime => v.preheat_time.to_string(),
            DraftField::SoakTemp => v.soak_temp.to_string(),
            DraftField::SoakTime => v.soak_time.to_string(),
            DraftField::ReflowTemp => v.reflow_temp.to_string(),
            DraftField::ReflowTime => v.reflow_time.to_string(),
            DraftField::CooldownTemp => v.cooldown_temp.to_string(),
            DraftField::CooldownTime => v.cooldown_time.to_string(),
            DraftField::Kp => g.kp.to_string(),
            DraftField::Ki => g.ki.to_string(),
            DraftField::Kd => g.kd.to_string(),
        }
    }

    pub(crate) fn mark_group_dirty(&mut self, group: FieldGroup) {
        match group {
            FieldGroup::Profile => self.profile_dirty = true,
            FieldGroup::Pid => self.pid_dirty = true,
        }
    }

    pub(crate) fn clear_group_dirty(&mut self, group: FieldGroup) {
        match group {
            FieldGroup::Profile => self.profile_dirty = false,
            FieldGroup::Pid => self.pid_dirty = false,
        }
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.profile_dirty = false;
        self.pid_dirty = false;
    }

    pub(crate) fn overwrite(&mut self, values: ProfileValues, gains: PidGains) {
        self.values = values;
        self.gains = gains;
    }

    /// Parse `raw` for `field` and store it. Unparseable input leaves the
    /// draft untouched.
    ///
    /// Temperatures and gains accept any float the way a number input does,
    /// including `NaN`; those are rejected later, before anything is sent.
    /// Times must be whole, non-negative seconds.
    pub(crate) fn set_from_str(&mut self, field: DraftField, raw: &str) -> Result<(), PanelError> {
        let raw = raw.trim();
        let number: f64 = raw.parse().map_err(|_| {
            PanelError::Validation(format!("{}: '{}' is not a number", field, raw))
        })?;

        if field.is_time() {
            if !number.is_finite() || number < 0.0 || number.fract() != 0.0 || number > u32::MAX as f64 {
                return Err(PanelError::Validation(format!(
                    "{}: '{}' is not a whole number of seconds",
                    field, raw
                )));
            }
            let secs = number as u32;
            match field {
                DraftField::PreheatTime => self.values.preheat_time = secs,
                DraftField::SoakTime => self.values.soak_time = secs,
                DraftField::ReflowTime => self.values.reflow_time = secs,
                DraftField::CooldownTime => self.values.cooldown_time = secs,
                _ => unreachable!("is_time covers exactly the time fields"),
            }
            return Ok(());
        }

        match field {
            DraftField::PreheatTemp => self.values.preheat_temp = number,
            DraftField::SoakTemp => self.values.soak_temp = number,
            DraftField::ReflowTemp => self.values.reflow_temp = number,
            DraftField::CooldownTemp => self.values.cooldown_temp = number,
            DraftField::Kp => self.gains.kp = number,
            DraftField::Ki => self.gains.ki = number,
            DraftField::Kd => self.gains.kd = number,
            _ => unreachable!("time fields handled above"),
        }
        Ok(())
    }
}
