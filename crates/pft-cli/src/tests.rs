use std::fs;

use clap::Parser;
use pft_core::cache::SyncCache;
use pft_core::config::{Area, AreaConfig, ProjectConfig};
use pft_core::store::LocalStore;
use pft_core::sync::SyncReport;
use pft_core::{ConflictPolicy, FeedbackItem};
use pretty_assertions::assert_eq;

use crate::cli::{Cli, Commands, CompletionShell};
use crate::commands::cache::{pending_work, AreaPending};
use crate::commands::common::{format_report_line, load_project, select_areas};
use crate::commands::completions::render_completions;
use crate::commands::conflicts::{conflict_to_item, format_conflict_lines};
use crate::commands::sync::{format_area_report, AreaReport, Pass};
use crate::error::CliError;

fn fider_area() -> AreaConfig {
    AreaConfig {
        provider: "fider".to_string(),
        url: "https://feedback.example.com".to_string(),
        ..AreaConfig::default()
    }
}

#[test]
fn parses_batch_arguments() {
    let cli = Cli::try_parse_from([
        "pft", "push", "--area", "voc", "--area", "VOB", "--dry-run", "--policy", "remote-wins",
    ])
    .unwrap();

    let Commands::Push(args) = cli.command else {
        panic!("expected push");
    };
    assert_eq!(args.areas, vec![Area::Voc, Area::Vob]);
    assert!(args.dry_run);
    assert_eq!(args.policy, Some(ConflictPolicy::RemoteWins));
}

#[test]
fn rejects_unknown_area_and_policy() {
    assert!(Cli::try_parse_from(["pft", "pull", "--area", "vox"]).is_err());
    assert!(Cli::try_parse_from(["pft", "sync", "--policy", "coin-flip"]).is_err());
}

#[test]
fn project_dir_is_global() {
    let cli = Cli::try_parse_from(["pft", "cache", "status", "--project-dir", "/tmp/docs"]).unwrap();
    assert_eq!(cli.project_dir.as_deref(), Some(std::path::Path::new("/tmp/docs")));
}

#[test]
fn select_areas_defaults_to_configured() {
    let config = ProjectConfig {
        voc: Some(fider_area()),
        vob: Some(AreaConfig::default()),
        ..ProjectConfig::default()
    };

    assert_eq!(select_areas(&config, &[]).unwrap(), vec![Area::Voc, Area::Vob]);
    assert_eq!(
        select_areas(&config, &[Area::Vob, Area::Vob]).unwrap(),
        vec![Area::Vob]
    );
    assert!(matches!(
        select_areas(&config, &[Area::Vos]),
        Err(CliError::AreaNotConfigured(Area::Vos))
    ));
}

#[test]
fn load_project_walks_up_to_config() {
    let temp = tempfile::tempdir().unwrap();
    let nested = temp.path().join("docs/VoC/nested");
    fs::create_dir_all(&nested).unwrap();
    let config = ProjectConfig {
        name: "demo".to_string(),
        path: "docs".to_string(),
        voc: Some(fider_area()),
        ..ProjectConfig::default()
    };
    config
        .save_to_path(&temp.path().join(".pft-config.json"))
        .unwrap();

    let project = load_project(Some(&nested)).unwrap();
    assert_eq!(project.config.name, "demo");
    assert_eq!(project.dir, temp.path().join("docs"));
}

#[test]
fn load_project_reports_missing_config() {
    let temp = tempfile::tempdir().unwrap();
    assert!(matches!(
        load_project(Some(temp.path())),
        Err(CliError::ConfigNotFound(_))
    ));
}

#[test]
fn load_project_rejects_invalid_provider() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(
        temp.path().join(".pft-config.json"),
        r#"{"name": "demo", "voc": {"provider": "canny", "url": "https://x.example.com"}}"#,
    )
    .unwrap();
    assert!(matches!(
        load_project(Some(temp.path())),
        Err(CliError::Core(pft_core::Error::Config(_)))
    ));
}

#[test]
fn report_lines_show_counts() {
    let report = SyncReport {
        created: 2,
        skipped: 1,
        ..SyncReport::default()
    };
    assert_eq!(
        format_report_line(Area::Voc, "fider", &report),
        "voc (fider): created 2, linked 0, skipped 1, failed 0"
    );

    let reconciled = SyncReport {
        updated: 1,
        manual: 2,
        ..SyncReport::default()
    };
    let line = format_area_report(
        &AreaReport {
            area: Area::Vos,
            provider: "clearflask".to_string(),
            pass: Pass::Reconcile,
            report: reconciled,
        },
        true,
    );
    assert_eq!(
        line,
        "[reconcile] vos (clearflask): created 0, linked 0, skipped 0, failed 0, updated 1, needs input 2"
    );
}

#[test]
fn report_line_flags_unstamped_creations() {
    let report = SyncReport {
        created: 1,
        failed: 1,
        unstamped: 1,
        ..SyncReport::default()
    };
    assert_eq!(
        format_report_line(Area::Voc, "fider", &report),
        "voc (fider): created 1, linked 0, skipped 0, failed 1 (1 created remotely but not stamped)"
    );
}

#[test]
fn pending_work_counts_unsynced_and_modified_records() {
    let temp = tempfile::tempdir().unwrap();
    let config = ProjectConfig {
        name: "demo".to_string(),
        voc: Some(fider_area()),
        ..ProjectConfig::default()
    };
    config
        .save_to_path(&temp.path().join(".pft-config.json"))
        .unwrap();
    let voc = temp.path().join("VoC");
    fs::create_dir_all(&voc).unwrap();
    fs::write(voc.join("UC001-login.md"), "# UC001: Login\n\n## Metadata\n- External ID: 7\n").unwrap();
    fs::write(voc.join("UC002-search.md"), "# UC002: Search\n").unwrap();

    let project = load_project(Some(temp.path())).unwrap();
    let store = LocalStore::for_project(&project.dir, Area::Voc);
    let mut cache = SyncCache::new(&project.dir);
    cache.record_sync(&store.read_item(&voc.join("UC001-login.md")).unwrap());
    fs::write(voc.join("UC001-login.md"), "# UC001: Login v2\n\n## Metadata\n- External ID: 7\n").unwrap();

    assert_eq!(
        pending_work(&project, &cache).unwrap(),
        vec![AreaPending {
            area: Area::Voc,
            records: 2,
            unsynced: 1,
            modified: 2,
        }]
    );
}

#[test]
fn conflict_preview_applies_policy_label() {
    let mut local = FeedbackItem::local("UC001-login", "Login", "/docs/VoC/UC001-login.md");
    local.external_id = Some("7".to_string());
    local.updated_at = "2024-05-02".to_string();
    let remote = FeedbackItem {
        status: "completed".to_string(),
        updated_at: "2024-05-01".to_string(),
        ..FeedbackItem::remote("7", "Login")
    };
    let conflict = pft_core::conflict::detect_conflict(&local, &remote).unwrap();

    let preview = conflict_to_item(Area::Voc, conflict.clone(), Some(ConflictPolicy::Timestamp));
    assert_eq!(preview.resolution.as_deref(), Some("kept local (newer)"));
    assert_eq!(preview.fields, vec!["status"]);

    let manual = conflict_to_item(Area::Voc, conflict, Some(ConflictPolicy::Manual));
    assert_eq!(
        format_conflict_lines(&[manual]),
        vec!["voc UC001-login [7]: modified fields: status -> manual resolution required"]
    );
}

#[test]
fn completions_mention_binary_name() {
    let script = String::from_utf8(render_completions(CompletionShell::Bash)).unwrap();
    assert!(script.contains("pft"));
    assert!(script.contains("conflicts"));
}
