//! Line-oriented operator console: command parsing and plain-text rendering.

use std::fmt::Write as _;

use crate::device::{PidGains, ProfileIdentity, ProfileValues};
use crate::error::PanelError;
use crate::panel::{Action, Command, Notice, PanelView};
use crate::reconcile::DraftField;

pub const HELP: &str = "\
Commands:
  show                      current status and draft
  profiles                  list stored profiles
  set <field> <value>       edit a draft field (preheat-temp, soak-time, kp, ...)
  load <name>               load a stored profile into the device and the draft
  save <name>               store the draft on the device under <name>
  delete <name> --yes       delete a stored profile
  push                      send the draft values to the active profile
  pid [kp ki kd] --yes      apply PID gains (draft gains if none given)
  start | stop              start or stop the reflow cycle
  help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Command(Command),
    Help,
    Quit,
    Empty,
}

fn is_confirm_flag(token: &str) -> bool {
    matches!(token, "--yes" | "-y" | "yes")
}

fn parse_number(token: &str, what: &str) -> Result<f64, PanelError> {
    token
        .parse::<f64>()
        .map_err(|_| PanelError::Validation(format!("{}: '{}' is not a number", what, token)))
}

pub fn parse_line(line: &str) -> Result<Input, PanelError> {
    let mut tokens = line.split_whitespace();
    let Some(verb) = tokens.next() else {
        return Ok(Input::Empty);
    };
    let rest: Vec<&str> = tokens.collect();
    let confirmed = rest.iter().any(|t| is_confirm_flag(t));
    let args: Vec<&str> = rest.iter().copied().filter(|t| !is_confirm_flag(t)).collect();
    let name = args.join(" ");

    let command = match verb.to_ascii_lowercase().as_str() {
        "help" | "?" => return Ok(Input::Help),
        "quit" | "exit" | "q" => return Ok(Input::Quit),
        "show" | "status" => Command::Show,
        "profiles" | "ls" => Command::ListProfiles,
        "set" => {
            let [field, value] = args.as_slice() else {
                return Err(PanelError::Validation("usage: set <field> <value>".to_string()));
            };
            Command::Edit {
                field: field.parse()?,
                value: value.to_string(),
            }
        }
        "start" => Command::Action(Action::Start),
        "stop" => Command::Action(Action::Stop),
        "save" => Command::Action(Action::Save { name }),
        "load" => Command::Action(Action::Load { name }),
        "delete" | "rm" => Command::Action(Action::Delete { name, confirmed }),
        "push" => Command::Action(Action::PushValues),
        "pid" => {
            let gains = match args.as_slice() {
                [] => None,
                [kp, ki, kd] => Some(PidGains {
                    kp: parse_number(kp, "kp")?,
                    ki: parse_number(ki, "ki")?,
                    kd: parse_number(kd, "kd")?,
                }),
                _ => {
                    return Err(PanelError::Validation(
                        "usage: pid [kp ki kd] --yes".to_string(),
                    ))
                }
            };
            Command::Action(Action::ApplyPid { gains, confirmed })
        }
        other => {
            return Err(PanelError::Validation(format!(
                "Unknown command '{}', try 'help'",
                other
            )))
        }
    };
    Ok(Input::Command(command))
}

fn profile_line(values: &ProfileValues) -> String {
    format!(
        "Preheat {} °C / {} s | Soak {} °C / {} s | Reflow {} °C / {} s | Cooldown {} °C / {} s",
        values.preheat_temp,
        values.preheat_time,
        values.soak_temp,
        values.soak_time,
        values.reflow_temp,
        values.reflow_time,
        values.cooldown_temp,
        values.cooldown_time
    )
}

fn gains_line(gains: &PidGains) -> String {
    format!("kp={} ki={} kd={}", gains.kp, gains.ki, gains.kd)
}

fn source_label(source: Option<&ProfileIdentity>) -> &str {
    source.map(|s| s.as_str()).unwrap_or("(none)")
}

pub fn render_view(view: &PanelView) -> String {
    let mut out = String::new();

    let Some(snapshot) = &view.snapshot else {
        out.push_str("No status data available yet.");
        if view.stale {
            out.push_str(" Device unreachable.");
        }
        return out;
    };

    let _ = writeln!(
        out,
        "Current Profile: {}",
        source_label(snapshot.active_profile.as_ref())
    );
    let phase = view.phase.map(|p| p.label()).unwrap_or("-");
    let _ = writeln!(
        out,
        "Reflow Status: {}{}",
        phase,
        if view.stale { "  [stale: device unreachable]" } else { "" }
    );
    let _ = writeln!(
        out,
        "Temperature: {:.1} °C  Target: {:.1} °C",
        snapshot.current_temperature, snapshot.setpoint
    );
    let _ = writeln!(
        out,
        "PID Output: {:.2}  Heater: {}",
        snapshot.pid_output,
        if snapshot.heater_on() { "On" } else { "Off" }
    );
    let _ = writeln!(out, "Time: {} s", snapshot.elapsed.as_secs());
    let _ = writeln!(
        out,
        "Profile: {} | Total {} s",
        profile_line(&snapshot.profile),
        snapshot.profile.total_time().as_secs()
    );
    let _ = writeln!(out, "PID: {}", gains_line(&snapshot.gains));

    if view.dirty {
        let _ = writeln!(
            out,
            "Draft (unsaved, from {}): {}",
            source_label(view.draft_source.as_ref()),
            profile_line(view.draft.values())
        );
        let _ = writeln!(out, "Draft PID: {}", gains_line(view.draft.gains()));
    }
    if let Some(kind) = view.pending {
        let _ = writeln!(out, "Pending: {}", kind);
    }
    if let Some(at) = view.last_updated {
        let _ = write!(out, "Last updated: {}", at.format("%H:%M:%S"));
    }
    out.trim_end().to_string()
}

pub fn render_notice(notice: &Notice) -> String {
    match notice {
        Notice::View(view) => render_view(view),
        Notice::Profiles(profiles) if profiles.is_empty() => "No stored profiles.".to_string(),
        Notice::Profiles(profiles) => {
            let names: Vec<&str> = profiles.iter().map(|p| p.as_str()).collect();
            format!("Profiles: {}", names.join(", "))
        }
        Notice::Edited { field, value } => format!("{} = {} (unsaved)", field, value),
        Notice::ActionDone(kind) => format!("{}: done", kind),
        Notice::ActionFailed { kind, message } => format!("{} failed: {}", kind, message),
        Notice::Rejected(message) => format!("Rejected: {}", message),
    }
}
