//! Operator actions: validation, the one-at-a-time guard, and what each
//! action does to the reconciler once the device answers.
//!
//! Every action runs through the same states:
//!
//! ```text
//! Idle -> Pending -> Resolved | Failed -> (status refresh settles) -> Idle
//! ```
//!
//! The refresh is issued whether the call succeeded or not, so the displayed
//! running state catches up with the device even if the call's own response
//! was lost. Nothing is retried.

use std::fmt;

use tracing::{info, warn};

use crate::device::{DeviceApi, PidGains, ProfileIdentity, ProfileValues};
use crate::error::PanelError;
use crate::reconcile::Reconciler;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Start,
    Stop,
    SaveProfile,
    LoadProfile,
    DeleteProfile,
    ApplyPid,
    SetValues,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActionKind::Start => "start",
            ActionKind::Stop => "stop",
            ActionKind::SaveProfile => "save profile",
            ActionKind::LoadProfile => "load profile",
            ActionKind::DeleteProfile => "delete profile",
            ActionKind::ApplyPid => "apply PID gains",
            ActionKind::SetValues => "set values",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionState {
    #[default]
    Idle,
    Pending(ActionKind),
    Resolved(ActionKind),
    Failed(ActionKind),
}

/// A validated request, ready to send.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    Start,
    Stop,
    /// `values` is the draft as it stood when the save was issued.
    /// `push_values` is sent with `/setvalues` first when the draft differs
    /// from what the device last reported, since the device saves its
    /// active values under the new name.
    SaveProfile {
        identity: ProfileIdentity,
        values: ProfileValues,
        push_values: Option<ProfileValues>,
    },
    LoadProfile {
        identity: ProfileIdentity,
    },
    DeleteProfile {
        identity: ProfileIdentity,
    },
    ApplyPid(PidGains),
    SetValues(ProfileValues),
}

impl RemoteCall {
    pub fn kind(&self) -> ActionKind {
        match self {
            RemoteCall::Start => ActionKind::Start,
            RemoteCall::Stop => ActionKind::Stop,
            RemoteCall::SaveProfile { .. } => ActionKind::SaveProfile,
            RemoteCall::LoadProfile { .. } => ActionKind::LoadProfile,
            RemoteCall::DeleteProfile { .. } => ActionKind::DeleteProfile,
            RemoteCall::ApplyPid(_) => ActionKind::ApplyPid,
            RemoteCall::SetValues(_) => ActionKind::SetValues,
        }
    }

    pub async fn execute<A: DeviceApi>(&self, api: &A) -> Result<(), PanelError> {
        match self {
            RemoteCall::Start => api.start().await,
            RemoteCall::Stop => api.stop().await,
            RemoteCall::SaveProfile {
                identity,
                push_values,
                ..
            } => {
                if let Some(values) = push_values {
                    api.set_values(values).await?;
                }
                let file_name = identity.file_name();
                api.save_profile(&file_name).await
            }
            RemoteCall::LoadProfile { identity } => {
                let file_name = identity.file_name();
                api.load_profile(&file_name).await
            }
            RemoteCall::DeleteProfile { identity } => {
                let file_name = identity.file_name();
                api.delete_profile(&file_name).await
            }
            RemoteCall::ApplyPid(gains) => api.set_pid_values(gains).await,
            RemoteCall::SetValues(values) => api.set_values(values).await,
        }
    }
}

/// Work to run once an action settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUp {
    /// The closing status refresh. With `load`, the result replaces the
    /// draft as an explicit load of that profile.
    RefreshStatus { load: Option<ProfileIdentity> },
    RefreshProfiles,
}

#[derive(Debug, Default)]
pub struct Dispatcher {
    state: ActionState,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ActionState {
        self.state
    }

    /// The action holding the guard, from the moment it is issued until its
    /// closing refresh settles.
    pub fn pending(&self) -> Option<ActionKind> {
        match self.state {
            ActionState::Idle => None,
            ActionState::Pending(kind) | ActionState::Resolved(kind) | ActionState::Failed(kind) => {
                Some(kind)
            }
        }
    }

    fn guard(&self) -> Result<(), PanelError> {
        match self.pending() {
            Some(kind) => Err(PanelError::Busy(kind.to_string())),
            None => Ok(()),
        }
    }

    fn issue(&mut self, call: RemoteCall) -> RemoteCall {
        info!("Issuing {}", call.kind());
        self.state = ActionState::Pending(call.kind());
        call
    }

    /// Unknown running state (no snapshot yet) is let through; the device
    /// ignores a redundant start.
    pub fn start(&mut self, rec: &Reconciler) -> Result<RemoteCall, PanelError> {
        self.guard()?;
        if rec.is_running() == Some(true) {
            warn!("Reflow is already running");
            return Err(PanelError::Conflict("Reflow is already running".to_string()));
        }
        Ok(self.issue(RemoteCall::Start))
    }

    pub fn stop(&mut self, rec: &Reconciler) -> Result<RemoteCall, PanelError> {
        self.guard()?;
        if rec.is_running() == Some(false) {
            warn!("Reflow is not running");
            return Err(PanelError::Conflict("Reflow is not running".to_string()));
        }
        Ok(self.issue(RemoteCall::Stop))
    }

    pub fn save_profile(&mut self, name: &str, rec: &Reconciler) -> Result<RemoteCall, PanelError> {
        self.guard()?;
        let identity = ProfileIdentity::new(name)
            .ok_or_else(|| PanelError::Validation("Please enter a profile name".to_string()))?;
        let values = *rec.draft().values();
        values.validate()?;

        let push_values = match rec.last_snapshot() {
            Some(snapshot) if snapshot.profile == values => None,
            _ => Some(values),
        };
        Ok(self.issue(RemoteCall::SaveProfile {
            identity,
            values,
            push_values,
        }))
    }

    pub fn load_profile(&mut self, name: &str) -> Result<RemoteCall, PanelError> {
        self.guard()?;
        let identity = ProfileIdentity::new(name)
            .ok_or_else(|| PanelError::Validation("No profile selected".to_string()))?;
        Ok(self.issue(RemoteCall::LoadProfile { identity }))
    }

    pub fn delete_profile(&mut self, name: &str, confirmed: bool) -> Result<RemoteCall, PanelError> {
        self.guard()?;
        let identity = ProfileIdentity::new(name).ok_or_else(|| {
            PanelError::Validation("Please select a profile to delete".to_string())
        })?;
        if !confirmed {
            return Err(PanelError::NotConfirmed(format!("delete \"{}\"", identity)));
        }
        Ok(self.issue(RemoteCall::DeleteProfile { identity }))
    }

    /// Live gains are overwritten with no way back, hence the confirmation.
    pub fn apply_pid_gains(&mut self, gains: PidGains, confirmed: bool) -> Result<RemoteCall, PanelError> {
        self.guard()?;
        gains.validate()?;
        if !confirmed {
            return Err(PanelError::NotConfirmed(
                "change PID values (the old values will not be saved)".to_string(),
            ));
        }
        Ok(self.issue(RemoteCall::ApplyPid(gains)))
    }

    /// Push the draft's numbers into the device's active profile without
    /// renaming it.
    pub fn set_values(&mut self, rec: &Reconciler) -> Result<RemoteCall, PanelError> {
        self.guard()?;
        let values = *rec.draft().values();
        values.validate()?;
        Ok(self.issue(RemoteCall::SetValues(values)))
    }

    /// Record the outcome of `call` and return what must run next. The
    /// closing status refresh is always included.
    pub fn settle(
        &mut self,
        call: &RemoteCall,
        result: &Result<(), PanelError>,
        rec: &mut Reconciler,
    ) -> Vec<FollowUp> {
        let kind = call.kind();
        if self.state != ActionState::Pending(kind) {
            warn!("Settling {} while dispatcher is {:?}", kind, self.state);
        }

        if let Err(e) = result {
            warn!("{} failed: {}", kind, e);
            self.state = ActionState::Failed(kind);
            return vec![FollowUp::RefreshStatus { load: None }];
        }

        info!("{} succeeded", kind);
        self.state = ActionState::Resolved(kind);

        let mut follow_ups = Vec::new();
        let mut load = None;
        match call {
            RemoteCall::SaveProfile {
                identity, values, ..
            } => {
                rec.after_save(identity.clone(), values);
                follow_ups.push(FollowUp::RefreshProfiles);
            }
            RemoteCall::DeleteProfile { identity } => {
                if rec.forget_source(identity) {
                    info!("Deleted the profile the draft came from; draft kept");
                }
                follow_ups.push(FollowUp::RefreshProfiles);
            }
            RemoteCall::LoadProfile { identity } => load = Some(identity.clone()),
            _ => {}
        }
        follow_ups.push(FollowUp::RefreshStatus { load });
        follow_ups
    }

    /// The closing refresh settled, successfully or not.
    pub fn complete_refresh(&mut self) {
        self.state = ActionState::Idle;
    }
}
