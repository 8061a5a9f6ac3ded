use crate::error::FatalError;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const MAINTENANCE_DIR: &str = ".logs";
pub const VAULT_MARKER: &str = ".obsidian";

/// Every path the maintenance tooling touches, anchored inside the vault.
#[derive(Debug, Clone)]
pub struct VaultPaths {
    pub root: PathBuf,
    pub logs_dir: PathBuf,
    pub run_log_file: PathBuf,
    pub moved_ledger_file: PathBuf,
    pub compressed_ledger_file: PathBuf,
    pub lock_file: PathBuf,
    pub config_file: PathBuf,
}

pub fn resolve_paths(root: &Path) -> VaultPaths {
    let logs_dir = root.join(MAINTENANCE_DIR);
    VaultPaths {
        root: root.to_path_buf(),
        run_log_file: logs_dir.join("vault-tidy.log"),
        moved_ledger_file: logs_dir.join("moved-images.json"),
        compressed_ledger_file: logs_dir.join("compressed-images.json"),
        lock_file: logs_dir.join("vault-tidy.lock"),
        config_file: root.join("vault-tidy.toml"),
        logs_dir,
    }
}

pub fn validate_root(root: &Path) -> Result<()> {
    if !root.is_dir() {
        return Err(FatalError::MissingRoot(root.display().to_string()).into());
    }
    Ok(())
}

/// Vault-shape check: the root must carry the `.obsidian/` marker folder.
/// Skippable via `--skip-vault-checking` for trees that are not real vaults.
pub fn validate_vault_marker(root: &Path) -> Result<()> {
    if !root.join(VAULT_MARKER).is_dir() {
        return Err(FatalError::NotAVault(root.display().to_string()).into());
    }
    Ok(())
}

pub fn ensure_maintenance_dir(paths: &VaultPaths) -> Result<()> {
    fs::create_dir_all(&paths.logs_dir)
        .with_context(|| format!("failed to create {}", paths.logs_dir.display()))?;
    Ok(())
}
