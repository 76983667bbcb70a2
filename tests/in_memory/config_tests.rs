//! Configuration files driving watcher timing.

use camino::Utf8PathBuf;
use checkbridge::{
    config::{BridgeConfig, ConfigError},
    run::{adapters::memory::ScriptedPoll, domain::CheckSuiteAction},
};
use rstest::rstest;
use std::time::Duration;

use super::bridge::{Bridge, event};

fn write_config(contents: &str) -> Result<(tempfile::TempDir, Utf8PathBuf), eyre::Report> {
    let temp = tempfile::tempdir()?;
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf())
        .map_err(|path| eyre::eyre!("non UTF-8 temp dir {}", path.display()))?;
    let path = root.join("checkbridge.yaml");
    std::fs::write(&path, contents)?;
    Ok((temp, path))
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn loaded_settings_bound_the_retry_loop() -> Result<(), eyre::Report> {
    let (_guard, path) = write_config(
        "watch:\n  poll_interval_secs: 1\n  max_poll_attempts: 2\n  backoff_initial_millis: 10\n  backoff_max_millis: 10\n",
    )?;
    let config = BridgeConfig::load(&path)?;
    let mut settings = config.watch_settings();
    eyre::ensure!(settings.backoff.max_attempts() == 2, "attempts come from the file");
    settings.poll_interval = Duration::from_millis(10);

    let bridge = Bridge::new(settings);
    bridge.declare(&["flaky"])?;
    bridge.script("flaky", vec![ScriptedPoll::fail("backend unreachable")])?;
    bridge
        .dispatcher
        .dispatch(&event(CheckSuiteAction::Requested)?)
        .await?;
    let finished = bridge.wait_for_finished(1).await?;
    let report = finished
        .first()
        .ok_or_else(|| eyre::eyre!("missing watch report"))?;

    eyre::ensure!(
        bridge.backend.poll_count(&report.run_id)? == 2,
        "polling stops after the configured attempts"
    );
    Ok(())
}

#[rstest]
fn invalid_file_is_rejected() -> Result<(), eyre::Report> {
    let (_guard, path) = write_config("watch:\n  max_poll_attempts: 0\n")?;
    let result = BridgeConfig::load(&path);
    eyre::ensure!(
        matches!(result, Err(ConfigError::Invalid(_))),
        "expected a validation error, got {result:?}"
    );
    Ok(())
}
