use thiserror::Error;

/// Setup-level failures. Anything here aborts the invocation before the
/// orchestrators mutate the vault; per-item failures never reach this enum.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("vault path does not exist: {0}")]
    MissingRoot(String),
    #[error("not a recognizable vault, `.obsidian/` marker folder not found: {0}")]
    NotAVault(String),
    #[error("ledger file is not a valid record array: {0}")]
    CorruptLedger(String),
    #[error("vault is locked by another vault-tidy instance: {0}")]
    VaultLocked(String),
    #[error("recompressor binary unavailable: {0}")]
    MissingRecompressor(String),
}
