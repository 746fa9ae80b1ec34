#![allow(clippy::expect_used, clippy::unwrap_used)]

//! Config file loading.

use std::io::Write;

use cheddar_session::config::{config_from_yaml, load_config, Config, ConfigError};

#[test]
fn explicit_file_overrides_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "logging:\n  level: debug\n  format: json\nreveal:\n  stagger_ms: 40\nfiller:\n  max_chars: 12\n  keywords: [\"um\", \"  \", \"uh\"]\nsession:\n  profile: exam\n  language: \"\"\n"
    )
    .unwrap();

    let path = file.path().to_str().unwrap().to_string();
    let (cfg, used) = load_config(Some(&path)).unwrap();
    assert_eq!(used.as_deref(), Some(file.path()));
    assert_eq!(cfg.logging.level, "debug");
    assert_eq!(cfg.logging.format, "json");
    assert_eq!(cfg.reveal.stagger_ms, 40);
    assert_eq!(cfg.filler.max_chars, 12);
    assert_eq!(cfg.filler.keywords, vec!["um", "uh"]);
    assert_eq!(cfg.session.profile, "exam");
    assert_eq!(cfg.session.language, "en-US");
    assert!(cfg.validate().is_ok());

    let policy = cfg.filler_policy();
    assert!(policy.is_filler("uh"));
    assert!(!policy.is_filler("hmm"));
}

#[test]
fn unreadable_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.yaml");
    let err = load_config(Some(missing.to_str().unwrap())).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn malformed_yaml_is_a_parse_error() {
    let err = config_from_yaml("reveal: [1, 2").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));

    let err = config_from_yaml("reveal:\n  stagger_ms: fast\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn explicit_zero_values_fail_validation() {
    let cfg = config_from_yaml("reveal:\n  stagger_ms: 0\n").unwrap();
    assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));

    let cfg = config_from_yaml("filler:\n  keywords: []\n").unwrap();
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("filler.keywords"));

    let cfg = config_from_yaml("filler:\n  max_chars: 0\n").unwrap();
    assert!(cfg.validate().is_err());
}

#[test]
fn reduced_motion_from_file() {
    let cfg = config_from_yaml("reveal:\n  reduced_motion: true\n").unwrap();
    assert!(cfg.reveal.reduced_motion);
    assert_eq!(cfg.reveal.stagger_ms, Config::default().reveal.stagger_ms);
}
