mod common;

use std::time::Duration;

use common::FakeDevice;
use reflowpanel::device::PhaseFlags;
use reflowpanel::reconcile::FieldGroup;
use reflowpanel::{
    Action, ActionState, DraftField, Panel, PanelError, Phase, PidGains, ProfileIdentity,
    ProfileValues,
};

fn panel(device: &FakeDevice) -> Panel<FakeDevice> {
    Panel::new(device.clone(), Duration::from_millis(500))
}

async fn ready_panel(device: &FakeDevice) -> Panel<FakeDevice> {
    let mut panel = panel(device);
    panel.refresh_status().await.unwrap();
    device.clear_calls();
    panel
}

fn lead_free() -> (ProfileValues, PidGains) {
    (
        ProfileValues {
            preheat_temp: 150.0,
            preheat_time: 90,
            soak_temp: 180.0,
            soak_time: 90,
            reflow_temp: 245.0,
            reflow_time: 60,
            cooldown_temp: 50.0,
            cooldown_time: 120,
        },
        PidGains {
            kp: 3.0,
            ki: 4.0,
            kd: 0.5,
        },
    )
}

#[tokio::test]
async fn test_first_status_fills_draft() {
    let device = FakeDevice::new();
    let mut panel = panel(&device);
    assert!(panel.view().snapshot.is_none());

    let snapshot = panel.refresh_status().await.unwrap().clone();
    let view = panel.view();

    assert_eq!(view.phase, Some(Phase::Idle));
    assert_eq!(view.draft.values(), &snapshot.profile);
    assert_eq!(view.draft_source.unwrap().as_str(), "default");
    assert!(!view.dirty);
    assert!(view.last_updated.is_some());
}

#[tokio::test]
async fn test_dirty_draft_survives_refresh() {
    let device = FakeDevice::new();
    let mut panel = ready_panel(&device).await;

    panel.edit(DraftField::PreheatTemp, "155").unwrap();
    device.update(|s| {
        s.status.profile.preheat_temp = 150.0;
        s.status.current_temperature = 61.0;
    });
    panel.refresh_status().await.unwrap();

    let view = panel.view();
    assert!(view.dirty);
    assert_eq!(view.draft.values().preheat_temp, 155.0);
    assert_eq!(view.snapshot.unwrap().current_temperature, 61.0);
}

#[tokio::test]
async fn test_load_replaces_dirty_draft() {
    let (values, gains) = lead_free();
    let device = FakeDevice::new().with_profile("reflow-lead-free.json", values, gains);
    let mut panel = ready_panel(&device).await;
    panel.edit(DraftField::SoakTime, "75").unwrap();

    panel
        .execute(Action::Load {
            name: "reflow-lead-free".into(),
        })
        .await
        .unwrap();

    assert_eq!(
        device.calls(),
        vec!["POST /loadprofile reflow-lead-free.json", "GET /status"]
    );
    let rec = panel.reconciler();
    assert!(!rec.is_dirty());
    assert_eq!(rec.draft().values(), &values);
    assert_eq!(rec.draft().gains(), &gains);
    assert_eq!(rec.draft_source().unwrap().as_str(), "reflow-lead-free");
    assert_eq!(panel.dispatcher().state(), ActionState::Idle);
}

#[tokio::test]
async fn test_delete_of_draft_source_keeps_values() {
    let (values, gains) = lead_free();
    let device = FakeDevice::new().with_profile("active-profile.json", values, gains);
    let mut panel = ready_panel(&device).await;
    panel
        .execute(Action::Load {
            name: "active-profile".into(),
        })
        .await
        .unwrap();
    panel.edit(DraftField::ReflowTemp, "250").unwrap();
    let draft = panel.reconciler().draft().clone();

    panel
        .execute(Action::Delete {
            name: "active-profile".into(),
            confirmed: true,
        })
        .await
        .unwrap();

    assert!(panel.reconciler().draft_source().is_none());
    assert_eq!(panel.reconciler().draft(), &draft);
    let names: Vec<&str> = panel.profiles().iter().map(|p| p.as_str()).collect();
    assert_eq!(names, vec!["default"]);
    assert_eq!(device.count("GET /profiles"), 1);
}

#[tokio::test]
async fn test_local_rejections_send_nothing() {
    let device = FakeDevice::new();
    let mut panel = ready_panel(&device).await;

    let err = panel.execute(Action::Save { name: "  ".into() }).await.unwrap_err();
    assert!(matches!(err, PanelError::Validation(_)));

    let err = panel.execute(Action::Stop).await.unwrap_err();
    assert!(matches!(err, PanelError::Conflict(_)));

    let err = panel
        .execute(Action::Delete {
            name: "default".into(),
            confirmed: false,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PanelError::NotConfirmed(_)));

    let err = panel
        .execute(Action::ApplyPid {
            gains: Some(PidGains {
                kp: f64::NAN,
                ki: 1.0,
                kd: 1.0,
            }),
            confirmed: true,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PanelError::Validation(_)));

    panel.edit(DraftField::PreheatTemp, "NaN").unwrap();
    let err = panel.execute(Action::Save { name: "x".into() }).await.unwrap_err();
    assert!(matches!(err, PanelError::Validation(_)));

    assert!(device.calls().is_empty());
    assert_eq!(panel.dispatcher().state(), ActionState::Idle);
}

#[tokio::test]
async fn test_start_while_running_is_a_conflict() {
    let device = FakeDevice::new();
    let mut panel = ready_panel(&device).await;

    panel.execute(Action::Start).await.unwrap();
    assert_eq!(device.calls(), vec!["GET /start", "GET /status"]);
    assert_eq!(panel.reconciler().is_running(), Some(true));
    assert_eq!(panel.view().phase, Some(Phase::Preheat));

    device.clear_calls();
    let err = panel.execute(Action::Start).await.unwrap_err();
    assert!(matches!(err, PanelError::Conflict(_)));
    assert!(device.calls().is_empty());
}

#[tokio::test]
async fn test_start_without_snapshot_is_sent() {
    let device = FakeDevice::new();
    let mut panel = panel(&device);

    panel.execute(Action::Start).await.unwrap();
    assert_eq!(device.calls(), vec!["GET /start", "GET /status"]);
    assert_eq!(panel.reconciler().is_running(), Some(true));
}

#[tokio::test]
async fn test_failed_write_still_refreshes() {
    let device = FakeDevice::new();
    let mut panel = ready_panel(&device).await;
    device.update(|s| s.fail_writes = true);

    let err = panel.execute(Action::Start).await.unwrap_err();
    assert!(matches!(err, PanelError::Device { status: 500, .. }));
    assert_eq!(device.calls(), vec!["GET /start", "GET /status"]);
    assert_eq!(panel.reconciler().is_running(), Some(false));
    assert_eq!(panel.dispatcher().state(), ActionState::Idle);
}

#[tokio::test]
async fn test_save_pushes_edited_values_first() {
    let device = FakeDevice::new();
    let mut panel = ready_panel(&device).await;
    panel.edit(DraftField::ReflowTemp, "240").unwrap();
    panel.edit(DraftField::ReflowTime, "90").unwrap();

    panel
        .execute(Action::Save {
            name: "custom".into(),
        })
        .await
        .unwrap();

    assert_eq!(
        device.calls(),
        vec![
            "POST /setvalues",
            "POST /saveprofile custom.json",
            "GET /profiles",
            "GET /status"
        ]
    );
    let rec = panel.reconciler();
    assert!(!rec.is_dirty());
    assert_eq!(rec.draft_source().unwrap().as_str(), "custom");
    assert_eq!(rec.draft().values().reflow_temp, 240.0);
    assert_eq!(rec.last_snapshot().unwrap().profile.reflow_time, 90);
    assert!(panel
        .profiles()
        .contains(&ProfileIdentity::new("custom").unwrap()));
}

#[tokio::test]
async fn test_save_of_unchanged_values_skips_push() {
    let device = FakeDevice::new();
    let mut panel = ready_panel(&device).await;

    panel
        .execute(Action::Save {
            name: "copy.json".into(),
        })
        .await
        .unwrap();

    assert_eq!(device.count("POST /setvalues"), 0);
    assert_eq!(device.count("POST /saveprofile copy.json"), 1);
}

#[tokio::test]
async fn test_save_keeps_unapplied_pid_edit() {
    let device = FakeDevice::new();
    let mut panel = ready_panel(&device).await;
    panel.edit(DraftField::Kp, "9").unwrap();

    panel.execute(Action::Save { name: "x".into() }).await.unwrap();

    assert_eq!(
        device.calls(),
        vec!["POST /saveprofile x.json", "GET /profiles", "GET /status"]
    );
    let rec = panel.reconciler();
    assert!(rec.draft().is_group_dirty(FieldGroup::Pid));
    assert!(!rec.draft().is_group_dirty(FieldGroup::Profile));
    assert_eq!(rec.draft().gains().kp, 9.0);
    assert_eq!(rec.last_snapshot().unwrap().gains.kp, 2.0);
    assert_eq!(rec.draft_source().unwrap().as_str(), "x");
}

#[tokio::test]
async fn test_failed_save_keeps_draft() {
    let device = FakeDevice::new();
    let mut panel = ready_panel(&device).await;
    panel.edit(DraftField::SoakTemp, "175").unwrap();
    let draft = panel.reconciler().draft().clone();
    device.update(|s| s.fail_writes = true);

    assert!(panel
        .execute(Action::Save {
            name: "custom".into(),
        })
        .await
        .is_err());

    let rec = panel.reconciler();
    assert!(rec.is_dirty());
    assert_eq!(rec.draft(), &draft);
    assert_eq!(rec.draft_source().unwrap().as_str(), "default");
    assert_eq!(device.count("GET /status"), 1);
    assert_eq!(device.count("GET /profiles"), 0);
}

#[tokio::test]
async fn test_apply_draft_pid_gains() {
    let device = FakeDevice::new();
    let mut panel = ready_panel(&device).await;
    panel.edit(DraftField::Kp, "2.5").unwrap();

    let err = panel
        .execute(Action::ApplyPid {
            gains: None,
            confirmed: false,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PanelError::NotConfirmed(_)));
    assert!(device.calls().is_empty());

    panel
        .execute(Action::ApplyPid {
            gains: None,
            confirmed: true,
        })
        .await
        .unwrap();
    assert_eq!(device.calls(), vec!["POST /setPIDvalues", "GET /status"]);
    assert_eq!(panel.reconciler().last_snapshot().unwrap().gains.kp, 2.5);
    // Only load and save make the draft clean.
    assert!(panel.reconciler().is_dirty());
}

#[tokio::test]
async fn test_push_values_updates_active_profile() {
    let device = FakeDevice::new();
    let mut panel = ready_panel(&device).await;
    panel.edit(DraftField::CooldownTemp, "40").unwrap();

    panel.execute(Action::PushValues).await.unwrap();

    assert_eq!(device.calls(), vec!["POST /setvalues", "GET /status"]);
    let snapshot = panel.reconciler().last_snapshot().unwrap();
    assert_eq!(snapshot.profile.cooldown_temp, 40.0);
    assert_eq!(snapshot.active_profile.as_ref().unwrap().as_str(), "default");
}

#[tokio::test]
async fn test_unreachable_device_marks_stale() {
    let device = FakeDevice::new();
    let mut panel = ready_panel(&device).await;
    panel.edit(DraftField::PreheatTime, "100").unwrap();
    let draft = panel.reconciler().draft().clone();
    device.update(|s| s.fail_status = true);

    let err = panel.refresh_status().await.unwrap_err();
    assert!(matches!(err, PanelError::Transport(_)));

    let view = panel.view();
    assert!(view.stale);
    assert!(view.snapshot.is_some());
    assert_eq!(view.draft, draft);

    device.update(|s| s.fail_status = false);
    panel.refresh_status().await.unwrap();
    assert!(!panel.view().stale);
}

#[tokio::test]
async fn test_running_without_phase_is_unknown() {
    let device = FakeDevice::new();
    device.update(|s| {
        s.status.running = true;
        s.status.phases = PhaseFlags::default();
    });
    let mut panel = panel(&device);

    let snapshot = panel.refresh_status().await.unwrap();
    assert!(matches!(snapshot.checked_phase(), Err(PanelError::UnknownPhase)));
    assert_eq!(panel.view().phase, Some(Phase::Unknown));
}

#[tokio::test]
async fn test_profile_listing_strips_suffix() {
    let (values, gains) = lead_free();
    let device = FakeDevice::new().with_profile("lead-free.json", values, gains);
    let mut panel = panel(&device);

    let names: Vec<String> = panel
        .refresh_profiles()
        .await
        .unwrap()
        .iter()
        .map(|p| p.to_string())
        .collect();
    assert_eq!(names, vec!["default", "lead-free"]);
}
