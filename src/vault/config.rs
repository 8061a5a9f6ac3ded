use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Immutable per-invocation configuration, threaded explicitly into the
/// orchestrators. There is no ambient mutable flag state anywhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TidyConfig {
    pub skip_vault_check: bool,
    pub skip_not_found: bool,
    pub only_actions: bool,
    pub quality: u8,
    pub pngquant_bin: Option<PathBuf>,
}

impl Default for TidyConfig {
    fn default() -> Self {
        Self {
            skip_vault_check: false,
            skip_not_found: false,
            only_actions: false,
            quality: 75,
            pngquant_bin: None,
        }
    }
}

/// Optional `vault-tidy.toml` at the vault root; every field optional.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialTidyConfig {
    skip_vault_check: Option<bool>,
    skip_not_found: Option<bool>,
    only_actions: Option<bool>,
    quality: Option<u8>,
    pngquant_bin: Option<PathBuf>,
}

/// CLI-level overrides; `None`/`false` means "not given on the command line".
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub skip_vault_check: bool,
    pub skip_not_found: bool,
    pub only_actions: bool,
    pub quality: Option<u8>,
    pub pngquant_bin: Option<PathBuf>,
}

fn env_or_u8(var: &str, fallback: u8) -> u8 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u8>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_bool(var: &str, fallback: bool) -> bool {
    match env::var(var) {
        Ok(v) => match v.trim() {
            "1" | "true" | "TRUE" | "yes" | "on" => true,
            "0" | "false" | "FALSE" | "no" | "off" => false,
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

fn env_or_path(var: &str, fallback: Option<PathBuf>) -> Option<PathBuf> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(PathBuf::from(v.trim())),
        _ => fallback,
    }
}

fn validate(cfg: &TidyConfig) -> Result<()> {
    if !(1..=100).contains(&cfg.quality) {
        return Err(anyhow!(
            "invalid quality {}: require 1 <= quality <= 100",
            cfg.quality
        ));
    }
    Ok(())
}

fn merge_partial(base: &mut TidyConfig, partial: PartialTidyConfig) {
    if let Some(v) = partial.skip_vault_check {
        base.skip_vault_check = v;
    }
    if let Some(v) = partial.skip_not_found {
        base.skip_not_found = v;
    }
    if let Some(v) = partial.only_actions {
        base.only_actions = v;
    }
    if let Some(v) = partial.quality {
        base.quality = v;
    }
    if let Some(v) = partial.pngquant_bin {
        base.pngquant_bin = Some(v);
    }
}

fn merge_file_config(base: &mut TidyConfig, config_file: &Path) -> Result<()> {
    if !config_file.exists() {
        return Ok(());
    }
    let raw = fs::read_to_string(config_file)?;
    let parsed: PartialTidyConfig = toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse {}: {err}", config_file.display()))?;
    merge_partial(base, parsed);
    Ok(())
}

/// Precedence, lowest to highest: built-in defaults, `vault-tidy.toml`,
/// `VAULT_TIDY_*` environment variables, command-line flags.
pub fn load_config(config_file: &Path, cli: &CliOverrides) -> Result<TidyConfig> {
    let mut cfg = TidyConfig::default();
    merge_file_config(&mut cfg, config_file)?;

    cfg.quality = env_or_u8("VAULT_TIDY_QUALITY", cfg.quality);
    cfg.skip_not_found = env_or_bool("VAULT_TIDY_SKIP_NOT_FOUND", cfg.skip_not_found);
    cfg.only_actions = env_or_bool("VAULT_TIDY_ONLY_ACTIONS", cfg.only_actions);
    cfg.pngquant_bin = env_or_path("VAULT_TIDY_PNGQUANT", cfg.pngquant_bin.take());

    if cli.skip_vault_check {
        cfg.skip_vault_check = true;
    }
    if cli.skip_not_found {
        cfg.skip_not_found = true;
    }
    if cli.only_actions {
        cfg.only_actions = true;
    }
    if let Some(q) = cli.quality {
        cfg.quality = q;
    }
    if let Some(bin) = &cli.pngquant_bin {
        cfg.pngquant_bin = Some(bin.clone());
    }

    validate(&cfg)?;
    Ok(cfg)
}
