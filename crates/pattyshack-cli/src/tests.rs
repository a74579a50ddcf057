use chrono::{Duration, TimeZone, Utc};
use pattyshack_core::config::RemoteConfig;
use pattyshack_core::offline::{NewAction, QueuedAction};
use serde_json::json;

use crate::commands::common::{format_action_lines, format_age, parse_object, Context};
use crate::commands::config::init_config;
use crate::commands::status::collect_status;
use crate::config_file::CliConfig;
use crate::error::CliError;

fn temp_context(dir: &tempfile::TempDir) -> Context {
    Context::load(
        Some(dir.path().join("offline.db")),
        Some(dir.path().join("cli-config.json")),
    )
    .unwrap()
}

fn env_configured() -> bool {
    std::env::var("PATTYSHACK_SUPABASE_URL").is_ok()
        || std::env::var("PATTYSHACK_SUPABASE_ANON_KEY").is_ok()
}

#[test]
fn parse_object_accepts_only_objects() {
    assert_eq!(
        parse_object(r#"{"title": "Close grill"}"#).unwrap(),
        json!({ "title": "Close grill" })
    );
    assert!(matches!(
        parse_object("[1, 2]"),
        Err(CliError::InvalidPayload(_))
    ));
    assert!(matches!(
        parse_object("{title"),
        Err(CliError::InvalidPayload(_))
    ));
}

#[test]
fn action_lines_show_target_and_retry_details() {
    let action: QueuedAction = serde_json::from_value(json!({
        "id": "0190f5c2-7a1b-7c3d-8e4f-1a2b3c4d5e6f",
        "type": "update",
        "table": "tasks",
        "data": { "id": "t7", "updates": { "status": "completed" } },
        "timestamp": "2024-03-01T08:00:00Z",
        "attempts": 2,
        "last_error": "Data API error: record locked (423)"
    }))
    .unwrap();

    let lines = format_action_lines(&[action]);

    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("3c4d5e6f  update"));
    assert!(lines[0].contains("t7"));
    assert!(lines[0].contains("2024-03-01 08:00:00 UTC"));
    assert!(lines[0].contains("attempts=2"));
    assert!(lines[0].contains("record locked"));
}

#[test]
fn format_age_uses_coarse_buckets() {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    assert_eq!(format_age(now, now), "just now");
    assert_eq!(format_age(now - Duration::minutes(5), now), "5m ago");
    assert_eq!(format_age(now - Duration::hours(3), now), "3h ago");
    assert_eq!(format_age(now - Duration::days(2), now), "2d ago");
}

#[test]
fn init_config_requires_url_and_key() {
    let missing_key = init_config(
        &CliConfig::default(),
        RemoteConfig {
            supabase_url: Some("https://demo.supabase.co".to_string()),
            ..RemoteConfig::default()
        },
    );
    assert!(missing_key.is_err());

    let existing = init_config(
        &CliConfig::default(),
        RemoteConfig {
            supabase_url: Some("https://demo.supabase.co/".to_string()),
            supabase_anon_key: Some("anon".to_string()),
            access_token: None,
        },
    )
    .unwrap();
    let updated = init_config(
        &existing,
        RemoteConfig {
            access_token: Some("user-token".to_string()),
            ..RemoteConfig::default()
        },
    )
    .unwrap();

    assert_eq!(
        updated.remote.supabase_url.as_deref(),
        Some("https://demo.supabase.co")
    );
    assert_eq!(updated.remote.access_token.as_deref(), Some("user-token"));
}

#[test]
fn invalid_offline_config_is_rejected_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("cli-config.json");
    std::fs::write(&config_path, r#"{"offline": {"max_attempts": 0}}"#).unwrap();

    let result = Context::load(Some(dir.path().join("offline.db")), Some(config_path));

    assert!(matches!(result, Err(CliError::Core(_))));
}

#[tokio::test]
async fn status_counts_queued_changes_without_remote_config() {
    if env_configured() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let ctx = temp_context(&dir);

    ctx.queue(ctx.open_store().unwrap())
        .enqueue(NewAction::delete("shifts", "sh1"))
        .await
        .unwrap();

    let report = collect_status(&ctx).await.unwrap();
    assert_eq!(report.online, None);
    assert_eq!(report.sync_state, None);
    assert_eq!(report.pending, 1);
    assert_eq!(report.dead_lettered, 0);
    assert!(report.last_synced.is_none());
}

#[test]
fn operations_require_remote_config() {
    if env_configured() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let ctx = temp_context(&dir);

    let result = ctx.operations(ctx.open_store().unwrap());

    assert!(matches!(result, Err(CliError::NotConfigured)));
}
