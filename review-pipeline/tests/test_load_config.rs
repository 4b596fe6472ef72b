use std::fs::write;
use std::path::PathBuf;

use tempfile::NamedTempFile;

/// A full config overrides layout and training defaults.
#[tokio::test]
async fn test_load_config_success_with_all_sections() {
    let config_yaml = r#"
bucket:
  root_dir: ./tmp/bucket
layout:
  raw_prefix: incoming/
  processed_prefix: curated/
  checkpoint_key: state/done.txt
  models_prefix: artifacts/
train:
  max_features: 250
  learning_rate: 0.1
  epochs: 20
  l2_penalty: 0.001
  holdout_every: 10
"#;
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), config_yaml).unwrap();

    let config =
        review_pipeline::load_config::load_config(config_file.path()).expect("Config should load");

    assert_eq!(config.bucket.root_dir, PathBuf::from("./tmp/bucket"));
    assert_eq!(config.layout.raw_prefix, "incoming/");
    assert_eq!(config.layout.processed_key(), "curated/processed_reviews.csv");
    assert_eq!(config.layout.checkpoint_key, "state/done.txt");
    assert_eq!(config.layout.model_key(), "artifacts/sentiment_model.json");
    assert_eq!(config.train.max_features, 250);
    assert_eq!(config.train.epochs, 20);
    assert_eq!(config.train.holdout_every, 10);
}

/// A minimal config only names the bucket root; every other key defaults.
#[tokio::test]
async fn test_load_config_applies_defaults_for_missing_sections() {
    let config_yaml = r#"
bucket:
  root_dir: ./data/bucket
"#;
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), config_yaml).unwrap();

    let config = review_pipeline::load_config::load_config(config_file.path())
        .expect("Loader should fill defaults");

    assert_eq!(config.layout.raw_prefix, "raw_reviews/");
    assert_eq!(
        config.layout.checkpoint_key,
        "metadata/processed_files.txt"
    );
    assert_eq!(
        config.layout.processed_key(),
        "processed_data/processed_reviews.csv"
    );
    assert_eq!(config.train.max_features, 5000);
}

/// A config without the bucket section cannot load.
#[tokio::test]
async fn test_load_config_errors_on_missing_bucket_section() {
    let config_yaml = r#"
layout:
  raw_prefix: incoming/
"#;
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), config_yaml).unwrap();

    let err = review_pipeline::load_config::load_config(config_file.path()).unwrap_err();
    assert!(
        err.to_string().contains("parse") || err.to_string().contains("YAML"),
        "Parse error expected, got: {err}"
    );
}

/// If the config file is not valid YAML, load_config errors and reports as such.
#[tokio::test]
async fn test_load_config_errors_for_invalid_file() {
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), b"not-yaml: [:::").unwrap();

    let err = review_pipeline::load_config::load_config(config_file.path()).unwrap_err();
    let msg = err.to_string();
    assert!(
        msg.contains("parse") || msg.contains("YAML"),
        "Parse error expected, got: {msg}"
    );
}

/// A path that does not exist is a read error, not a parse error.
#[tokio::test]
async fn test_load_config_errors_for_missing_file() {
    let err =
        review_pipeline::load_config::load_config("definitely/not/here.yaml").unwrap_err();
    assert!(
        err.to_string().contains("read"),
        "Read error expected, got: {err}"
    );
}
