use std::fmt;

use crate::device::StatusSnapshot;
use crate::error::PanelError;

/// Stage of the reflow process as shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Idle,
    Preheat,
    Soak,
    Reflow,
    Cooldown,
    /// Running with no phase flag set. The firmware and the panel disagree
    /// about the status contract.
    Unknown,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Idle => "Idle",
            Phase::Preheat => "Preheating",
            Phase::Soak => "Soaking",
            Phase::Reflow => "Reflowing",
            Phase::Cooldown => "Cooling down",
            Phase::Unknown => "Error: Unknown state",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Map a snapshot to the phase to display.
///
/// Not running wins over every phase flag. Otherwise the first set flag in
/// process order decides.
pub fn compute_display_status(snapshot: &StatusSnapshot) -> Phase {
    if !snapshot.running {
        return Phase::Idle;
    }
    let flags = &snapshot.phases;
    if flags.preheating {
        Phase::Preheat
    } else if flags.soaking {
        Phase::Soak
    } else if flags.reflowing {
        Phase::Reflow
    } else if flags.cooling_down {
        Phase::Cooldown
    } else {
        Phase::Unknown
    }
}

impl StatusSnapshot {
    pub fn phase(&self) -> Phase {
        compute_display_status(self)
    }

    /// Like [`StatusSnapshot::phase`], but a contract mismatch is an error.
    pub fn checked_phase(&self) -> Result<Phase, PanelError> {
        match self.phase() {
            Phase::Unknown => Err(PanelError::UnknownPhase),
            phase => Ok(phase),
        }
    }
}
