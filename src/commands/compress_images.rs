use crate::vault::compress::{self, CompressOutcome, Recompress};
use crate::vault::config::TidyConfig;
use crate::vault::ledger::Ledger;
use crate::vault::paths::VaultPaths;
use crate::vault::runlog::RunLog;
use anyhow::Result;

pub fn run(
    paths: &VaultPaths,
    cfg: &TidyConfig,
    ledger: &mut Ledger,
    log: &RunLog,
    codec: &dyn Recompress,
) -> Result<CompressOutcome> {
    let outcome = compress::compress_images(paths, cfg, ledger, log, codec)?;
    log.info(&format!(
        "Compress pass done: {} scanned, {} compressed, {} skipped, {} failed, {} -> {} bytes",
        outcome.scanned,
        outcome.compressed,
        outcome.skipped,
        outcome.failed,
        outcome.old_bytes,
        outcome.new_bytes
    ))?;
    Ok(outcome)
}
