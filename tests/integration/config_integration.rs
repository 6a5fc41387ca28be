//! Configuration loading, validation and source wiring

use arbor::api::source_from_config;
use arbor::cli::{Commands, OutputFormat, RunContext, SourceOverride};
use arbor::config::{ArborConfig, ConfigLoader, SortOrder, SourceKind};
use arbor::error::{CliError, ConfigError};
use arbor::types::NodeId;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_fixture(dir: &Path) -> PathBuf {
    let path = dir.join("plant.json");
    fs::write(
        &path,
        r#"{"nodes": [
            {"id": 1, "name": "Plant"},
            {"id": 2, "parentId": 1, "name": "Pump"},
            {"id": 3, "parentId": 1, "name": "Valve"}
        ]}"#,
    )
    .unwrap();
    path
}

#[test]
fn test_load_full_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("arbor.toml");
    fs::write(
        &path,
        r#"
[cache]
list_stale_after_ms = 60000
search_stale_after_ms = 1000

[browse]
children_page_size = 25
sort = "fetch"

[search]
limit = 50

[source]
kind = "http"
endpoint = "https://nodes.example.com/api"
timeout_ms = 2500
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&path).unwrap().validated().unwrap();
    assert_eq!(config.cache.list_stale_after_ms, 60_000);
    assert_eq!(config.cache.retrieve_stale_after_ms, 300_000);
    assert_eq!(config.browse.children_page_size, 25);
    assert_eq!(config.browse.root_page_size, 100);
    assert_eq!(config.browse.sort, SortOrder::Fetch);
    assert_eq!(config.search.limit, 50);
    assert_eq!(config.source.kind, SourceKind::Http);
    assert_eq!(config.source.timeout().as_millis(), 2500);
}

#[test]
fn test_invalid_file_reports_every_violation() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("arbor.toml");
    fs::write(
        &path,
        r#"
[cache]
list_stale_after_ms = 1000
search_stale_after_ms = 2000

[search]
limit = 0
"#,
    )
    .unwrap();

    let err = ConfigLoader::load_from_file(&path)
        .unwrap()
        .validated()
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("search_stale_after_ms"));
    assert!(message.contains("limit must be at least 1"));
}

#[test]
fn test_unknown_sort_fails_to_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("arbor.toml");
    fs::write(&path, "[browse]\nsort = \"random\"\n").unwrap();

    assert!(matches!(
        ConfigLoader::load_from_file(&path),
        Err(ConfigError::Load(_))
    ));
}

#[test]
fn test_missing_fixture_is_a_config_error() {
    let mut config = ArborConfig::default();
    config.source.fixture = Some(PathBuf::from("/nonexistent/arbor/fixture.json"));
    assert!(matches!(
        source_from_config(&config),
        Err(ConfigError::Fixture(_))
    ));
}

#[tokio::test]
async fn test_workspace_config_drives_run_context() {
    let temp_dir = TempDir::new().unwrap();
    let fixture = write_fixture(temp_dir.path());
    let config_dir = temp_dir.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("config.toml"),
        format!(
            "[source]\nkind = \"memory\"\nfixture = '{}'\n\n[browse]\nsort = \"fetch\"\n",
            fixture.display()
        ),
    )
    .unwrap();

    let context = RunContext::new(
        temp_dir.path().to_path_buf(),
        None,
        SourceOverride::default(),
        OutputFormat::Text,
    )
    .unwrap()
    .with_color(false);
    assert_eq!(context.config().browse.sort, SortOrder::Fetch);

    let output = context
        .execute(&Commands::Browse {
            root_ids: vec![],
            expand: vec![NodeId::Int(1)],
            more: vec![],
        })
        .await
        .unwrap();
    assert_eq!(output, "Plant #1 (2)\n  Pump #2 (0)\n  Valve #3 (0)");
}

#[test]
fn test_endpoint_override_is_validated() {
    let temp_dir = TempDir::new().unwrap();
    let result = RunContext::new(
        temp_dir.path().to_path_buf(),
        None,
        SourceOverride {
            fixture: None,
            endpoint: Some("ftp://nodes.example.com".to_string()),
        },
        OutputFormat::Json,
    );
    assert!(matches!(result, Err(CliError::Config(ConfigError::Invalid(_)))));
}
