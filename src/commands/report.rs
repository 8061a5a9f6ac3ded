use crate::vault::ledger::{read_compression_records, read_move_records};
use crate::vault::paths::VaultPaths;
use crate::vault::report::{compression_stats, move_stats, render, run_stats};
use crate::vault::runlog::read_events;
use anyhow::Result;

/// Pure read-only reconstruction: absent ledgers and logs read as empty, and
/// nothing is written, locked, or created.
pub fn run(paths: &VaultPaths) -> Result<()> {
    let moves = read_move_records(&paths.moved_ledger_file)?;
    let compressions = read_compression_records(&paths.compressed_ledger_file)?;
    let events = read_events(&paths.run_log_file)?;

    let text = render(
        &compression_stats(&compressions),
        &move_stats(&moves),
        &run_stats(&events),
    );
    print!("{text}");
    Ok(())
}
