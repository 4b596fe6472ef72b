use assert_cmd::Command;
use predicates::prelude::*;
use serial_test::serial;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// Creates a config file inside the bucket's parent dir pointing at `root`.
fn write_config(dir: &Path, root: &Path) -> std::path::PathBuf {
    let config_path = dir.join("pipeline.yaml");
    let config = format!(
        "bucket:\n  root_dir: {}\ntrain:\n  max_features: 100\n  learning_rate: 0.5\n  epochs: 300\n  l2_penalty: 0.0\n  holdout_every: 0\n",
        root.display()
    );
    fs::write(&config_path, config).expect("Writing temp config failed");
    config_path
}

fn seed_raw_file(root: &Path, name: &str, content: &str) {
    let path = root.join("raw_reviews").join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
#[serial]
fn ingest_cli_happy_flow_writes_output_and_reports() {
    let workspace = tempdir().unwrap();
    let bucket = workspace.path().join("bucket");
    let config = write_config(workspace.path(), &bucket);
    seed_raw_file(&bucket, "2024-01.csv", "Text,Score\ngreat tea,5\nawful tea,1\n");

    let mut cmd = Command::cargo_bin("review-pipeline").expect("Binary exists");
    cmd.arg("ingest").arg("--config").arg(&config);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("rows_written"))
        .stdout(predicate::str::contains("raw_reviews/2024-01.csv"));

    assert!(bucket.join("processed_data/processed_reviews.csv").exists());
    assert!(bucket.join("metadata/processed_files.txt").exists());
}

#[test]
#[serial]
fn second_ingest_run_short_circuits_without_output() {
    let workspace = tempdir().unwrap();
    let bucket = workspace.path().join("bucket");
    let config = write_config(workspace.path(), &bucket);
    seed_raw_file(&bucket, "2024-01.csv", "Text,Score\ngreat tea,5\n");

    Command::cargo_bin("review-pipeline")
        .unwrap()
        .arg("ingest")
        .arg("--config")
        .arg(&config)
        .assert()
        .success();

    Command::cargo_bin("review-pipeline")
        .unwrap()
        .arg("ingest")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"output_key\": null"));
}

#[test]
#[serial]
fn full_pipeline_ingest_train_predict_round_trips() {
    let workspace = tempdir().unwrap();
    let bucket = workspace.path().join("bucket");
    let config = write_config(workspace.path(), &bucket);
    let mut rows = String::from("Text,Score\n");
    for _ in 0..3 {
        rows.push_str("wonderful delicious great tea,5\n");
        rows.push_str("awful terrible stale mess,1\n");
    }
    seed_raw_file(&bucket, "2024-01.csv", &rows);

    Command::cargo_bin("review-pipeline")
        .unwrap()
        .arg("ingest")
        .arg("--config")
        .arg(&config)
        .assert()
        .success();

    Command::cargo_bin("review-pipeline")
        .unwrap()
        .arg("train")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("sentiment_model.json"));

    Command::cargo_bin("review-pipeline")
        .unwrap()
        .arg("predict")
        .arg("--config")
        .arg(&config)
        .arg("--text")
        .arg("wonderful delicious tea")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"label\": 5"));
}

#[test]
#[serial]
fn predict_without_artifacts_fails_loudly() {
    let workspace = tempdir().unwrap();
    let bucket = workspace.path().join("bucket");
    let config = write_config(workspace.path(), &bucket);

    Command::cargo_bin("review-pipeline")
        .unwrap()
        .arg("predict")
        .arg("--config")
        .arg(&config)
        .arg("--text")
        .arg("anything")
        .assert()
        .failure()
        .stderr(predicate::str::contains("artifact"));
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::Context, Layer, Registry};
use tracing_subscriber::prelude::*; // needed for .with()

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        use std::fmt::Write as FmtWrite;
        let mut msg = String::new();
        let _ = write!(&mut msg, "{:?}", event);
        self.events.lock().unwrap().push(msg);
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use review_pipeline::cli::{run, Cli, Commands};

    // Provide minimum config for the Ingest subcommand (using a dummy path).
    let cli = Cli {
        command: Commands::Ingest {
            config: std::path::PathBuf::from("dummy.yaml"),
        },
    };

    let _ = run(cli).await;

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs
            .iter()
            .any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
