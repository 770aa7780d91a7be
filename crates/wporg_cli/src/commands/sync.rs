//! Sync command implementation.

use crate::client::ReqwestClient;
use crate::output::SingerWriter;
use crate::settings::Settings;
use crate::state_file::JsonStateFile;
use std::path::Path;
use tracing::{error, info};
use wporg_sync_engine::{HttpTransport, SyncEngine};

/// Runs the sync command.
///
/// Records go to stdout. The run fails if any endpoint failed, after every
/// other endpoint has been synced and the final state written.
pub fn run(
    settings: &Settings,
    state_path: Option<&Path>,
    endpoints: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = settings.sync_config()?;
    if !endpoints.is_empty() {
        config = config.with_endpoints(endpoints.iter().cloned());
    }

    let store = match state_path {
        Some(path) => JsonStateFile::open(path)?,
        None => JsonStateFile::in_memory(),
    };
    let transport = HttpTransport::new(ReqwestClient::new(settings.timeout()?)?);
    let engine = SyncEngine::new(config, transport, store);

    let stdout = std::io::stdout();
    let mut writer = SingerWriter::new(stdout.lock());
    let report = engine.sync_all(&mut writer)?;
    writer.write_state(engine.store().to_value())?;

    let stats = engine.stats();
    info!(
        completed = stats.runs_completed,
        failed = stats.runs_failed,
        records = stats.records_emitted,
        degraded = stats.records_degraded,
        "sync finished"
    );

    let failed: Vec<&str> = report
        .failed()
        .map(|(name, err)| {
            error!(endpoint = name, error = %err, retryable = err.is_retryable(), "endpoint failed");
            name
        })
        .collect();

    if failed.is_empty() {
        Ok(())
    } else {
        Err(format!("{} endpoint(s) failed: {}", failed.len(), failed.join(", ")).into())
    }
}
