use std::env;
use std::io::Write;

use country_alerts::config::{AppConfig, ConfigOverrides, ENV_CONFIG_PATH};
use serial_test::serial;
use tempfile::NamedTempFile;

fn write_toml(s: &str) -> NamedTempFile {
    let mut f = NamedTempFile::new().expect("tmp");
    f.write_all(s.as_bytes()).expect("write");
    f
}

fn clear_env() {
    for k in [ENV_CONFIG_PATH, "CSE_ENDPOINT", "CSE_API_KEY", "CSE_CX"] {
        env::remove_var(k);
    }
}

#[test]
#[serial]
fn explicit_file_is_loaded_and_cli_wins() {
    clear_env();
    let f = write_toml(
        r#"
entities = ["Hardy", "Ernest"]
lookback_hours = 12
search_results_per_entity = 5
"#,
    );
    let cfg = AppConfig::load(ConfigOverrides {
        entity: None,
        lookback_hours: Some(6),
        config_path: Some(f.path().to_path_buf()),
    })
    .expect("load");
    assert_eq!(cfg.entities, vec!["Hardy".to_string(), "Ernest".to_string()]);
    assert_eq!(cfg.lookback_hours, 6);
    assert_eq!(cfg.search_results_per_entity, 5);
}

#[test]
#[serial]
fn env_path_is_used_when_no_flag() {
    clear_env();
    let f = write_toml("feeds = [\"https://example.com/feed\"]\n");
    env::set_var(ENV_CONFIG_PATH, f.path());
    let cfg = AppConfig::load(ConfigOverrides::default()).expect("load");
    assert_eq!(cfg.feeds, vec!["https://example.com/feed".to_string()]);
    env::remove_var(ENV_CONFIG_PATH);
}

#[test]
#[serial]
fn missing_or_invalid_file_is_fatal() {
    clear_env();
    let missing = AppConfig::load(ConfigOverrides {
        config_path: Some("/definitely/not/here.toml".into()),
        ..Default::default()
    });
    assert!(missing.is_err());

    let bad = write_toml("entities = 3\n");
    let parsed = AppConfig::load(ConfigOverrides {
        config_path: Some(bad.path().to_path_buf()),
        ..Default::default()
    });
    assert!(parsed.is_err());

    let unknown = write_toml("colour = \"blue\"\n");
    assert!(AppConfig::load(ConfigOverrides {
        config_path: Some(unknown.path().to_path_buf()),
        ..Default::default()
    })
    .is_err());

    env::set_var(ENV_CONFIG_PATH, "/definitely/not/here.toml");
    assert!(AppConfig::load(ConfigOverrides::default()).is_err());
    env::remove_var(ENV_CONFIG_PATH);
}

#[test]
#[serial]
fn empty_roster_is_fatal() {
    clear_env();
    let f = write_toml("entities = [\"  \", \"\"]\n");
    let res = AppConfig::load(ConfigOverrides {
        config_path: Some(f.path().to_path_buf()),
        ..Default::default()
    });
    assert!(res.is_err());
}

#[test]
#[serial]
fn search_endpoint_env_overrides_file() {
    clear_env();
    let f = write_toml("search_endpoint = \"https://file.example/cse\"\n");
    env::set_var("CSE_ENDPOINT", "https://env.example/cse");
    let cfg = AppConfig::load(ConfigOverrides {
        config_path: Some(f.path().to_path_buf()),
        ..Default::default()
    })
    .expect("load");
    assert_eq!(cfg.search_endpoint, "https://env.example/cse");
    env::remove_var("CSE_ENDPOINT");
}

#[test]
#[serial]
fn describe_env_masks_secrets() {
    clear_env();
    env::set_var("CSE_API_KEY", "AIzaSyVerySecretValue1234");
    env::set_var("CSE_CX", "engine-id");
    let f = write_toml("");
    let cfg = AppConfig::load(ConfigOverrides {
        config_path: Some(f.path().to_path_buf()),
        ..Default::default()
    })
    .expect("load");
    let line = cfg.describe_env();
    assert!(line.contains("AIzaSy...1234"));
    assert!(!line.contains("VerySecret"));
    assert!(cfg.credentials.search().is_some());
    clear_env();
}
