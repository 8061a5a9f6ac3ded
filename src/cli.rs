use crate::commands;
use crate::error::FatalError;
use crate::vault::compress::PngquantCodec;
use crate::vault::config::{self, CliOverrides};
use crate::vault::ledger::Ledger;
use crate::vault::paths::{
    VaultPaths, ensure_maintenance_dir, resolve_paths, validate_root, validate_vault_marker,
};
use crate::vault::runlog::RunLog;
use anyhow::{Context, Result, bail};
use clap::Parser;
use fs2::FileExt;
use std::fs;
use std::path::PathBuf;

/// Keep an Obsidian-style vault tidy: move loose images next to their
/// documents, recompress PNGs in place, and report the savings.
#[derive(Debug, Parser)]
#[command(name = "vault-tidy", version)]
struct TidyArgs {
    /// Vault root path
    vault_path: PathBuf,

    /// Relocate referenced images into per-document assets/ folders
    #[arg(long)]
    move_images: bool,

    /// Recompress PNG images in place
    #[arg(long)]
    compress_images: bool,

    /// Print aggregate statistics reconstructed from the ledgers and run log
    #[arg(long)]
    report: bool,

    /// Skip the `.obsidian/` vault-shape check
    #[arg(long)]
    skip_vault_checking: bool,

    /// Do not report referenced images that cannot be found
    #[arg(long)]
    skip_not_found: bool,

    /// Log only actions, not per-file progress
    #[arg(long)]
    only_actions: bool,

    /// Recompression quality, 1-100
    #[arg(long)]
    quality: Option<u8>,

    /// Path to the pngquant binary
    #[arg(long)]
    pngquant: Option<PathBuf>,
}

/// Exclusive lock held for the lifetime of a mutating invocation. Two
/// concurrent instances would interleave ledger flushes, so the second one
/// fails fast instead.
struct VaultLock {
    _file: fs::File,
}

fn acquire_lock(paths: &VaultPaths) -> Result<VaultLock> {
    let file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .open(&paths.lock_file)
        .with_context(|| format!("failed to open {}", paths.lock_file.display()))?;
    if file.try_lock_exclusive().is_err() {
        return Err(FatalError::VaultLocked(paths.lock_file.display().to_string()).into());
    }
    Ok(VaultLock { _file: file })
}

pub fn run() -> Result<()> {
    let args = TidyArgs::parse();
    if !(args.move_images || args.compress_images || args.report) {
        bail!("nothing to do; pass --move-images, --compress-images and/or --report");
    }

    let vault_paths = resolve_paths(&args.vault_path);
    validate_root(&vault_paths.root)?;

    let overrides = CliOverrides {
        skip_vault_check: args.skip_vault_checking,
        skip_not_found: args.skip_not_found,
        only_actions: args.only_actions,
        quality: args.quality,
        pngquant_bin: args.pngquant.clone(),
    };
    let cfg = config::load_config(&vault_paths.config_file, &overrides)?;

    if !cfg.skip_vault_check {
        validate_vault_marker(&vault_paths.root)?;
    }

    if args.move_images || args.compress_images {
        // Every fatal condition is checked before the first write: codec
        // resolution, then the maintenance dir, lock, and ledger load.
        let codec = if args.compress_images {
            Some(PngquantCodec::resolve(&cfg)?)
        } else {
            None
        };

        ensure_maintenance_dir(&vault_paths)?;
        let _lock = acquire_lock(&vault_paths)?;
        let mut ledger = Ledger::load(&vault_paths)?;
        let log = RunLog::open(&vault_paths, cfg.only_actions)?;

        if !cfg.skip_vault_check {
            log.info(&format!(
                "Vault path validated: {}",
                vault_paths.root.display()
            ))?;
        }
        log.run_started()?;

        if args.move_images {
            commands::move_images::run(&vault_paths, &cfg, &mut ledger, &log)?;
        }
        if let Some(codec) = &codec {
            commands::compress_images::run(&vault_paths, &cfg, &mut ledger, &log, codec)?;
        }

        log.run_finished()?;
    }

    if args.report {
        commands::report::run(&vault_paths)?;
    }

    Ok(())
}
