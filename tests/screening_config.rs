use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use smearscan::config::ScreeningConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "SMEARSCAN_CONFIG",
        "SMEARSCAN_UPLOAD_BASE_URL",
        "SMEARSCAN_CLOUD_NAME",
        "SMEARSCAN_UPLOAD_PRESET",
        "SMEARSCAN_WORKFLOW_URL",
        "SMEARSCAN_API_KEY",
        "SMEARSCAN_TIMEOUT_SECS",
        "SMEARSCAN_SYNTHETIC_FALLBACK",
        "SMEARSCAN_FALLBACK_SEED",
    ] {
        std::env::remove_var(key);
    }
}

fn write_config(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    file
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(
        r#"{
            "upload": {
                "base_url": "https://upload.example.test/v1_1",
                "cloud_name": "lab-cloud",
                "upload_preset": "smears"
            },
            "workflow": {
                "url": "https://detect.example.test/infer/workflows/lab/malaria",
                "api_key": "file-key"
            },
            "timeouts": {
                "upload_secs": 15,
                "detect_secs": 45
            },
            "fallback": {
                "synthetic": true
            }
        }"#,
    );

    std::env::set_var("SMEARSCAN_CONFIG", file.path());
    std::env::set_var("SMEARSCAN_API_KEY", "env-key");
    std::env::set_var("SMEARSCAN_SYNTHETIC_FALLBACK", "off");
    std::env::set_var("SMEARSCAN_FALLBACK_SEED", "99");

    let cfg = ScreeningConfig::load().expect("load config");

    assert_eq!(cfg.upload.base_url, "https://upload.example.test/v1_1");
    assert_eq!(cfg.upload.cloud_name, "lab-cloud");
    assert_eq!(cfg.upload.upload_preset, "smears");
    assert_eq!(
        cfg.workflow.url,
        "https://detect.example.test/infer/workflows/lab/malaria"
    );
    assert_eq!(cfg.workflow.api_key, "env-key");
    assert_eq!(cfg.upload_timeout, Duration::from_secs(15));
    assert_eq!(cfg.detect_timeout, Duration::from_secs(45));
    assert!(!cfg.fallback.synthetic);
    assert_eq!(cfg.fallback.seed, Some(99));
    assert!(cfg.live_inference_configured());

    clear_env();
}

#[test]
fn defaults_apply_without_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("SMEARSCAN_TIMEOUT_SECS", "7");

    let cfg = ScreeningConfig::load().expect("load config");
    assert_eq!(cfg.upload.base_url, "https://api.cloudinary.com/v1_1");
    assert_eq!(cfg.upload_timeout, Duration::from_secs(7));
    assert_eq!(cfg.detect_timeout, Duration::from_secs(7));
    assert!(cfg.fallback.synthetic);
    assert!(cfg.fallback.seed.is_none());
    assert!(!cfg.live_inference_configured());

    clear_env();
}

#[test]
fn rejects_invalid_env_values() {
    let _guard = ENV_LOCK.lock().unwrap();

    for (key, value) in [
        ("SMEARSCAN_TIMEOUT_SECS", "soon"),
        ("SMEARSCAN_TIMEOUT_SECS", "0"),
        ("SMEARSCAN_TIMEOUT_SECS", "301"),
        ("SMEARSCAN_SYNTHETIC_FALLBACK", "maybe"),
        ("SMEARSCAN_FALLBACK_SEED", "-1"),
        ("SMEARSCAN_UPLOAD_BASE_URL", "not a url"),
        ("SMEARSCAN_WORKFLOW_URL", "ftp://detect.example.test/wf"),
    ] {
        clear_env();
        std::env::set_var(key, value);
        assert!(
            ScreeningConfig::load().is_err(),
            "{}={} should be rejected",
            key,
            value
        );
    }

    clear_env();
}

#[test]
fn rejects_unreadable_or_malformed_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config("{ not json");
    std::env::set_var("SMEARSCAN_CONFIG", file.path());
    let err = ScreeningConfig::load().unwrap_err();
    assert!(err.to_string().contains("invalid config file"));

    std::env::set_var("SMEARSCAN_CONFIG", "/nonexistent/smearscan.json");
    let err = ScreeningConfig::load().unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));

    clear_env();
}
