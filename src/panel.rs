//! The control panel session.
//!
//! A single task owns the [`Reconciler`], [`Dispatcher`] and [`Poller`] and is
//! the only place their state changes. Network calls run as spawned tasks and
//! report back over a channel, so a slow request never blocks polling or
//! operator input.

use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::device::{DeviceApi, PidGains, ProfileIdentity, StatusSnapshot};
use crate::dispatch::{ActionKind, Dispatcher, FollowUp, RemoteCall};
use crate::error::PanelError;
use crate::poller::Poller;
use crate::reconcile::{DraftField, FormDraft, Phase, Reconciler};

/// Operator actions that go to the device.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Start,
    Stop,
    Save { name: String },
    Load { name: String },
    Delete { name: String, confirmed: bool },
    /// `None` applies the draft's gains.
    ApplyPid { gains: Option<PidGains>, confirmed: bool },
    PushValues,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Show,
    ListProfiles,
    Edit { field: DraftField, value: String },
    Action(Action),
}

/// What the operator should be told.
#[derive(Debug, Clone)]
pub enum Notice {
    View(Box<PanelView>),
    Profiles(Vec<ProfileIdentity>),
    Edited { field: DraftField, value: String },
    ActionDone(ActionKind),
    ActionFailed { kind: ActionKind, message: String },
    Rejected(String),
}

/// Everything the display needs, copied out of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelView {
    pub snapshot: Option<StatusSnapshot>,
    pub phase: Option<Phase>,
    pub stale: bool,
    pub last_updated: Option<DateTime<Local>>,
    pub draft: FormDraft,
    pub dirty: bool,
    pub draft_source: Option<ProfileIdentity>,
    pub pending: Option<ActionKind>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Origin {
    Poll,
    /// Closing refresh of an action.
    Action { load: Option<ProfileIdentity> },
    /// One-off read outside the action cycle.
    Manual,
}

enum Event {
    Status {
        origin: Origin,
        result: Result<StatusSnapshot, PanelError>,
    },
    Profiles(Result<Vec<String>, PanelError>),
    Settled {
        call: RemoteCall,
        result: Result<(), PanelError>,
    },
}

/// Parts of the state whose change is worth telling the operator about
/// without being asked.
#[derive(Debug, PartialEq)]
struct DisplayKey {
    phase: Option<Phase>,
    stale: bool,
    active_profile: Option<ProfileIdentity>,
}

pub struct Panel<A: DeviceApi> {
    api: A,
    reconciler: Reconciler,
    dispatcher: Dispatcher,
    poller: Poller,
    profiles: Vec<ProfileIdentity>,
}

impl<A: DeviceApi> Panel<A> {
    pub fn new(api: A, poll_interval: Duration) -> Self {
        Self {
            api,
            reconciler: Reconciler::new(),
            dispatcher: Dispatcher::new(),
            poller: Poller::new(poll_interval),
            profiles: Vec::new(),
        }
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    pub fn profiles(&self) -> &[ProfileIdentity] {
        &self.profiles
    }

    pub fn view(&self) -> PanelView {
        let rec = &self.reconciler;
        PanelView {
            snapshot: rec.last_snapshot().cloned(),
            phase: rec.display_phase(),
            stale: rec.is_stale(),
            last_updated: rec.last_updated(),
            draft: rec.draft().clone(),
            dirty: rec.is_dirty(),
            draft_source: rec.draft_source().cloned(),
            pending: self.dispatcher.pending(),
        }
    }

    /// Operator edit of one draft field.
    pub fn edit(&mut self, field: DraftField, value: &str) -> Result<(), PanelError> {
        self.reconciler.edit_field(field, value)
    }

    /// Validate and guard an action. On success the dispatcher is pending
    /// and the returned call must be executed and settled.
    fn begin_action(&mut self, action: Action) -> Result<RemoteCall, PanelError> {
        let rec = &self.reconciler;
        let dispatcher = &mut self.dispatcher;
        match action {
            Action::Start => dispatcher.start(rec),
            Action::Stop => dispatcher.stop(rec),
            Action::Save { name } => dispatcher.save_profile(&name, rec),
            Action::Load { name } => dispatcher.load_profile(&name),
            Action::Delete { name, confirmed } => dispatcher.delete_profile(&name, confirmed),
            Action::ApplyPid { gains, confirmed } => {
                let gains = gains.unwrap_or(*rec.draft().gains());
                dispatcher.apply_pid_gains(gains, confirmed)
            }
            Action::PushValues => dispatcher.set_values(rec),
        }
    }

    fn display_key(&self) -> DisplayKey {
        DisplayKey {
            phase: self.reconciler.display_phase(),
            stale: self.reconciler.is_stale(),
            active_profile: self
                .reconciler
                .last_snapshot()
                .and_then(|s| s.active_profile.clone()),
        }
    }

    /// Apply a status result. Returns true if the operator-visible summary
    /// changed.
    fn apply_status(&mut self, origin: Origin, result: Result<StatusSnapshot, PanelError>) -> bool {
        let before = self.display_key();

        match result {
            Ok(snapshot) => {
                let load_as = match &origin {
                    Origin::Action { load: Some(identity) } => Some(identity.clone()),
                    _ => None,
                };
                let values = snapshot.profile;
                let gains = snapshot.gains;
                self.reconciler.ingest_status(snapshot);
                if let Some(identity) = load_as {
                    info!("Loaded profile '{}' into the draft", identity);
                    self.reconciler.load_profile(identity, values, gains);
                }
            }
            Err(e) => {
                if let Origin::Action { load: Some(identity) } = &origin {
                    warn!("Could not read back profile '{}' after loading: {}", identity, e);
                }
                self.reconciler.mark_unreachable(&e);
            }
        }

        match origin {
            Origin::Poll => self.poller.complete(),
            Origin::Action { .. } => self.dispatcher.complete_refresh(),
            Origin::Manual => {}
        }

        before != self.display_key()
    }

    fn apply_profiles(&mut self, result: Result<Vec<String>, PanelError>) -> Result<(), PanelError> {
        let names = result.map_err(|e| {
            warn!("Error loading profiles: {}", e);
            e
        })?;
        self.profiles = names.iter().filter_map(|n| ProfileIdentity::new(n)).collect();
        debug!("Retrieved {} profiles", self.profiles.len());
        Ok(())
    }

    /// One status read, applied like a poll.
    pub async fn refresh_status(&mut self) -> Result<&StatusSnapshot, PanelError> {
        match self.api.status().await {
            Ok(snapshot) => {
                self.apply_status(Origin::Manual, Ok(snapshot));
                self.reconciler
                    .last_snapshot()
                    .ok_or_else(|| PanelError::Transport("no status received".to_string()))
            }
            Err(e) => {
                self.reconciler.mark_unreachable(&e);
                Err(e)
            }
        }
    }

    pub async fn refresh_profiles(&mut self) -> Result<&[ProfileIdentity], PanelError> {
        let result = self.api.list_profiles().await;
        self.apply_profiles(result)?;
        Ok(&self.profiles)
    }

    /// Run one action to completion, follow-ups included, without the
    /// polling loop. Local rejections return before any request is sent.
    pub async fn execute(&mut self, action: Action) -> Result<(), PanelError> {
        let call = self.begin_action(action)?;
        let result = call.execute(&self.api).await;
        let follow_ups = self.dispatcher.settle(&call, &result, &mut self.reconciler);

        for follow_up in follow_ups {
            match follow_up {
                FollowUp::RefreshProfiles => {
                    let profiles = self.api.list_profiles().await;
                    let _ = self.apply_profiles(profiles);
                }
                FollowUp::RefreshStatus { load } => {
                    let status = self.api.status().await;
                    self.apply_status(Origin::Action { load }, status);
                }
            }
        }
        result
    }

    /// Poll the device and serve operator commands until `cancel` fires or
    /// the command channel closes. Returns the session for inspection.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        notices: UnboundedSender<Notice>,
        cancel: CancellationToken,
    ) -> Self {
        let (events_tx, mut events) = mpsc::unbounded_channel::<Event>();
        let mut timer = self.poller.timer();
        info!("Polling device every {:?}", self.poller.period());

        self.spawn_profiles(&events_tx);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    if self.poller.in_flight() {
                        debug!("Abandoning outstanding status fetch");
                    }
                    info!("Panel session stopping");
                    break;
                }
                _ = timer.tick() => {
                    if self.poller.begin_tick() {
                        self.spawn_status(&events_tx, Origin::Poll);
                    }
                }
                Some(event) = events.recv() => {
                    self.handle_event(event, &events_tx, &notices);
                }
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command, &events_tx, &notices),
                    None => {
                        info!("Command input closed");
                        break;
                    }
                },
            }
        }
        self
    }

    fn handle_command(
        &mut self,
        command: Command,
        events: &UnboundedSender<Event>,
        notices: &UnboundedSender<Notice>,
    ) {
        match command {
            Command::Show => {
                let _ = notices.send(Notice::View(Box::new(self.view())));
            }
            Command::ListProfiles => self.spawn_profiles(events),
            Command::Edit { field, value } => match self.edit(field, &value) {
                Ok(()) => {
                    let value = self.reconciler.draft().display_value(field);
                    let _ = notices.send(Notice::Edited { field, value });
                }
                Err(e) => {
                    let _ = notices.send(Notice::Rejected(e.into()));
                }
            },
            Command::Action(action) => match self.begin_action(action) {
                Ok(call) => self.spawn_call(events, call),
                Err(e) => {
                    let _ = notices.send(Notice::Rejected(e.into()));
                }
            },
        }
    }

    fn handle_event(
        &mut self,
        event: Event,
        events: &UnboundedSender<Event>,
        notices: &UnboundedSender<Notice>,
    ) {
        match event {
            Event::Status { origin, result } => {
                if self.apply_status(origin, result) {
                    let _ = notices.send(Notice::View(Box::new(self.view())));
                }
            }
            Event::Profiles(result) => {
                if self.apply_profiles(result).is_ok() {
                    let _ = notices.send(Notice::Profiles(self.profiles.clone()));
                }
            }
            Event::Settled { call, result } => {
                let kind = call.kind();
                let notice = match &result {
                    Ok(()) => Notice::ActionDone(kind),
                    Err(e) => Notice::ActionFailed {
                        kind,
                        message: e.to_string(),
                    },
                };
                let follow_ups = self.dispatcher.settle(&call, &result, &mut self.reconciler);
                let _ = notices.send(notice);

                for follow_up in follow_ups {
                    match follow_up {
                        FollowUp::RefreshProfiles => self.spawn_profiles(events),
                        FollowUp::RefreshStatus { load } => {
                            self.spawn_status(events, Origin::Action { load })
                        }
                    }
                }
            }
        }
    }

    fn spawn_status(&self, events: &UnboundedSender<Event>, origin: Origin) {
        let api = self.api.clone();
        let events = events.clone();
        tokio::spawn(async move {
            let result = api.status().await;
            let _ = events.send(Event::Status { origin, result });
        });
    }

    fn spawn_profiles(&self, events: &UnboundedSender<Event>) {
        let api = self.api.clone();
        let events = events.clone();
        tokio::spawn(async move {
            let result = api.list_profiles().await;
            let _ = events.send(Event::Profiles(result));
        });
    }

    fn spawn_call(&self, events: &UnboundedSender<Event>, call: RemoteCall) {
        let api = self.api.clone();
        let events = events.clone();
        tokio::spawn(async move {
            let result = call.execute(&api).await;
            let _ = events.send(Event::Settled { call, result });
        });
    }
}
