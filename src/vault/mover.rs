use crate::vault::config::TidyConfig;
use crate::vault::identity::hash_file;
use crate::vault::ledger::{Ledger, MoveRecord};
use crate::vault::paths::VaultPaths;
use crate::vault::refs::extract_embeds;
use crate::vault::runlog::{RunLog, now_rfc3339};
use crate::vault::walk::files_with_extension;
use anyhow::{Context, Result, bail};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

pub const ASSETS_DIR: &str = "assets";

#[derive(Debug, Clone, Copy, Default)]
pub struct MoveOutcome {
    pub documents: usize,
    pub references: usize,
    pub moved: usize,
    pub already_moved: usize,
    pub missing: usize,
    pub failed: usize,
}

fn move_file(from: &Path, to: &Path) -> Result<()> {
    match fs::rename(from, to) {
        Ok(_) => Ok(()),
        Err(rename_err) => {
            if matches!(
                rename_err.kind(),
                ErrorKind::CrossesDevices | ErrorKind::PermissionDenied
            ) {
                fs::copy(from, to).with_context(|| {
                    format!("failed to copy {} to {}", from.display(), to.display())
                })?;
                fs::remove_file(from)
                    .with_context(|| format!("failed to remove {}", from.display()))?;
                Ok(())
            } else {
                Err(rename_err).with_context(|| {
                    format!("failed to move {} to {}", from.display(), to.display())
                })
            }
        }
    }
}

/// Relocate one document's referenced assets into its `assets/` folder.
///
/// Per-asset failures are advisory: logged, counted, and the remaining
/// assets continue. Only environment-level failures (unreadable document,
/// uncreatable assets folder, ledger flush failure) bubble up.
fn move_assets_for_document(
    doc: &Path,
    paths: &VaultPaths,
    cfg: &TidyConfig,
    ledger: &mut Ledger,
    log: &RunLog,
    outcome: &mut MoveOutcome,
) -> Result<()> {
    let text = fs::read_to_string(doc)
        .with_context(|| format!("failed to read document {}", doc.display()))?;
    let embeds = extract_embeds(&text);
    if embeds.is_empty() {
        // No references, no side effects. Not even folder creation.
        return Ok(());
    }

    let doc_dir = doc
        .parent()
        .with_context(|| format!("document has no parent directory: {}", doc.display()))?;
    let assets_dir = doc_dir.join(ASSETS_DIR);
    if !assets_dir.exists() {
        fs::create_dir(&assets_dir)
            .with_context(|| format!("failed to create {}", assets_dir.display()))?;
        log.action(&format!("Created assets directory: {}", assets_dir.display()))?;
    }

    for name in embeds {
        outcome.references += 1;

        // Invariant: no operation escapes the vault root. Absolute
        // references must be rejected too: `Path::join` replaces the base
        // entirely when handed an absolute path.
        let reference = Path::new(&name);
        if reference.is_absolute()
            || reference.components().any(|c| {
                use std::path::Component;
                matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_))
            })
        {
            outcome.failed += 1;
            log.action(&format!("Error moving {name}: reference escapes the vault root"))?;
            continue;
        }

        let candidate = paths.root.join(&name);

        if !candidate.exists() {
            if ledger.contains_move(&name) {
                // Absence at the old location is evidence of a prior
                // successful move, never reported as missing again.
                outcome.already_moved += 1;
            } else {
                outcome.missing += 1;
                if !cfg.skip_not_found {
                    log.action(&format!("Image not found in vault root: {name}"))?;
                }
            }
            continue;
        }

        match relocate_asset(&name, &candidate, &assets_dir, ledger, log) {
            Ok(()) => outcome.moved += 1,
            Err(err) => {
                outcome.failed += 1;
                log.action(&format!("Error moving {}: {err:#}", candidate.display()))?;
            }
        }
    }
    Ok(())
}

fn relocate_asset(
    name: &str,
    candidate: &Path,
    assets_dir: &Path,
    ledger: &mut Ledger,
    log: &RunLog,
) -> Result<()> {
    let file_name = Path::new(name)
        .file_name()
        .with_context(|| format!("reference has no file name: {name}"))?;
    let destination = assets_dir.join(file_name);
    if destination.exists() {
        bail!("destination already exists: {}", destination.display());
    }

    // Content hash is rename-invariant, so take it before the move; a file
    // that cannot be read fails here, before anything is touched.
    let content_hash = hash_file(candidate)?;

    move_file(candidate, &destination)?;

    ledger.append_move(MoveRecord {
        asset_name: name.to_string(),
        source_path: candidate.display().to_string(),
        destination_path: destination.display().to_string(),
        content_hash,
        timestamp: now_rfc3339(),
    });
    // Write-through per record: a move is a destructive rename, so the
    // ledger must reflect it before the next asset is attempted.
    ledger.flush_moves()?;

    log.action(&format!(
        "Moved image: {} -> {}",
        candidate.display(),
        destination.display()
    ))?;
    Ok(())
}

/// Move Orchestrator: walk every Markdown document and relocate its
/// referenced assets, consulting and extending the move ledger.
pub fn move_assets(
    paths: &VaultPaths,
    cfg: &TidyConfig,
    ledger: &mut Ledger,
    log: &RunLog,
) -> Result<MoveOutcome> {
    log.action("Start moving images")?;
    let documents = files_with_extension(&paths.root, "md")?;
    log.info(&format!("Found {} markdown files", documents.len()))?;

    let mut outcome = MoveOutcome::default();
    for doc in documents {
        outcome.documents += 1;
        log.info(&format!("Processing markdown file: {}", doc.display()))?;
        if let Err(err) = move_assets_for_document(&doc, paths, cfg, ledger, log, &mut outcome) {
            outcome.failed += 1;
            log.action(&format!("Error processing {}: {err:#}", doc.display()))?;
        }
    }
    Ok(outcome)
}
