//! Keeps the operator's editable draft in step with polled device state.
//!
//! Telemetry always follows the latest snapshot. The draft follows the device
//! only while it has no unsaved edits; once dirty it changes only through an
//! explicit load or a successful save.

pub mod draft;
pub mod phase;

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use crate::device::{PidGains, ProfileIdentity, ProfileValues, StatusSnapshot};
use crate::error::PanelError;

pub use draft::{DraftField, FieldGroup, FormDraft};
pub use phase::{compute_display_status, Phase};

/// What an ingest did to the draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftSync {
    /// Draft overwritten from the snapshot.
    Followed,
    /// Draft has unsaved edits and was left alone.
    Kept,
}

#[derive(Debug, Default)]
pub struct Reconciler {
    last_snapshot: Option<StatusSnapshot>,
    draft: FormDraft,
    draft_source: Option<ProfileIdentity>,
    stale: bool,
    last_updated: Option<DateTime<Local>>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_snapshot(&self) -> Option<&StatusSnapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn draft(&self) -> &FormDraft {
        &self.draft
    }

    pub fn draft_source(&self) -> Option<&ProfileIdentity> {
        self.draft_source.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.draft.is_dirty()
    }

    /// Last poll failed; `last_snapshot` is what we had before that.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn last_updated(&self) -> Option<DateTime<Local>> {
        self.last_updated
    }

    /// Displayed phase, if any snapshot has arrived.
    pub fn display_phase(&self) -> Option<Phase> {
        self.last_snapshot.as_ref().map(compute_display_status)
    }

    pub fn is_running(&self) -> Option<bool> {
        self.last_snapshot.as_ref().map(|s| s.running)
    }

    /// Apply a fresh snapshot. Replaces the previous one whole.
    pub fn ingest_status(&mut self, snapshot: StatusSnapshot) -> DraftSync {
        let sync = if self.draft.is_dirty() {
            debug!("Draft has unsaved edits, not following device values");
            DraftSync::Kept
        } else {
            self.draft.overwrite(snapshot.profile, snapshot.gains);
            self.draft_source = snapshot.active_profile.clone();
            DraftSync::Followed
        };

        if self.stale {
            info!("Device reachable again");
        }
        self.stale = false;
        self.last_updated = Some(Local::now());
        self.last_snapshot = Some(snapshot);
        sync
    }

    /// Record a failed status fetch. The previous snapshot stays current but
    /// is flagged stale; the draft is not touched.
    pub fn mark_unreachable(&mut self, error: &PanelError) {
        if !self.stale {
            warn!("Status unavailable, showing stale data: {}", error);
        } else {
            debug!("Status still unavailable: {}", error);
        }
        self.stale = true;
    }

    /// An operator edit touched `group`. Idempotent.
    pub fn mark_dirty(&mut self, group: FieldGroup) {
        self.draft.mark_group_dirty(group);
    }

    /// Operator input for one form field. Invalid input is rejected without
    /// changing the draft or the dirty state.
    pub fn edit_field(&mut self, field: DraftField, raw: &str) -> Result<(), PanelError> {
        self.draft.set_from_str(field, raw)?;
        self.mark_dirty(field.group());
        debug!("Draft field {} set to {}", field, raw.trim());
        Ok(())
    }

    /// Explicit load: replace the draft regardless of unsaved edits.
    pub fn load_profile(&mut self, identity: ProfileIdentity, values: ProfileValues, gains: PidGains) {
        if self.draft.is_dirty() {
            info!("Discarding unsaved edits to load '{}'", identity);
        }
        self.draft.overwrite(values, gains);
        self.draft.clear_dirty();
        self.draft_source = Some(identity);
    }

    /// `saved` was stored on the device as `identity`. Returns true if the
    /// profile fields are clean afterwards.
    ///
    /// Profile edits made after the save was issued are not in `saved` and
    /// stay dirty. PID edits stay dirty too: a save does not send gains.
    pub fn after_save(&mut self, identity: ProfileIdentity, saved: &ProfileValues) -> bool {
        self.draft_source = Some(identity);
        if self.draft.values() == saved {
            self.draft.clear_group_dirty(FieldGroup::Profile);
            true
        } else {
            info!("Draft changed while saving, keeping unsaved edits");
            false
        }
    }

    /// `identity` was deleted on the device. If the draft came from it, the
    /// draft no longer has a source; its values are kept.
    pub fn forget_source(&mut self, identity: &ProfileIdentity) -> bool {
        if self.draft_source.as_ref() == Some(identity) {
            self.draft_source = None;
            true
        } else {
            false
        }
    }
}
