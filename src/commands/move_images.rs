use crate::vault::config::TidyConfig;
use crate::vault::ledger::Ledger;
use crate::vault::mover::{self, MoveOutcome};
use crate::vault::paths::VaultPaths;
use crate::vault::runlog::RunLog;
use anyhow::Result;

pub fn run(
    paths: &VaultPaths,
    cfg: &TidyConfig,
    ledger: &mut Ledger,
    log: &RunLog,
) -> Result<MoveOutcome> {
    let outcome = mover::move_assets(paths, cfg, ledger, log)?;
    log.info(&format!(
        "Move pass done: {} documents, {} references, {} moved, {} already moved, {} missing, {} failed",
        outcome.documents,
        outcome.references,
        outcome.moved,
        outcome.already_moved,
        outcome.missing,
        outcome.failed
    ))?;
    Ok(outcome)
}
