use crate::error::FatalError;
use crate::vault::paths::VaultPaths;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// One successfully relocated asset. `source_path` is historical and may be
/// stale; `asset_name` is the durable dedup key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveRecord {
    pub asset_name: String,
    pub source_path: String,
    pub destination_path: String,
    pub content_hash: String,
    pub timestamp: String,
}

/// One successfully recompressed image. `content_hash` is the hash of the
/// *post-compression* bytes, which is what makes the skip check survive
/// renames and moves. `path` is historical.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionRecord {
    pub path: String,
    pub content_hash: String,
    pub old_size: u64,
    pub new_size: u64,
    pub timestamp: String,
}

/// Single writer for both record collections. Orchestrators go through the
/// in-memory indexes for membership and through `append_*`/`flush_*` for
/// updates; nothing else touches the backing files.
#[derive(Debug)]
pub struct Ledger {
    moved_file: PathBuf,
    compressed_file: PathBuf,
    moves: Vec<MoveRecord>,
    compressions: Vec<CompressionRecord>,
    moved_names: HashSet<String>,
    compressed_hashes: HashSet<String>,
}

fn read_array<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str::<Vec<T>>(&raw)
        .map_err(|_| FatalError::CorruptLedger(path.display().to_string()).into())
}

fn write_array<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let data = serde_json::to_string_pretty(records)?;
    fs::write(path, format!("{data}\n"))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Read-only accessors for report mode: absent files are empty collections
/// and nothing is created on disk.
pub fn read_move_records(path: &Path) -> Result<Vec<MoveRecord>> {
    read_array(path)
}

pub fn read_compression_records(path: &Path) -> Result<Vec<CompressionRecord>> {
    read_array(path)
}

impl Ledger {
    /// Load both collections and build the membership indexes. Absent files
    /// are initialized to empty arrays and persisted immediately, so the
    /// ledger files always exist after first use. A present-but-malformed
    /// file is a `CorruptLedger` fatal error.
    pub fn load(paths: &VaultPaths) -> Result<Self> {
        let moves: Vec<MoveRecord> = read_array(&paths.moved_ledger_file)?;
        let compressions: Vec<CompressionRecord> = read_array(&paths.compressed_ledger_file)?;

        let ledger = Self {
            moved_file: paths.moved_ledger_file.clone(),
            compressed_file: paths.compressed_ledger_file.clone(),
            moved_names: moves.iter().map(|r| r.asset_name.clone()).collect(),
            compressed_hashes: compressions.iter().map(|r| r.content_hash.clone()).collect(),
            moves,
            compressions,
        };

        if !ledger.moved_file.exists() {
            ledger.flush_moves()?;
        }
        if !ledger.compressed_file.exists() {
            ledger.flush_compressions()?;
        }
        Ok(ledger)
    }

    pub fn contains_move(&self, asset_name: &str) -> bool {
        self.moved_names.contains(asset_name)
    }

    pub fn contains_compression(&self, content_hash: &str) -> bool {
        self.compressed_hashes.contains(content_hash)
    }

    pub fn append_move(&mut self, record: MoveRecord) {
        self.moved_names.insert(record.asset_name.clone());
        self.moves.push(record);
    }

    pub fn append_compression(&mut self, record: CompressionRecord) {
        self.compressed_hashes.insert(record.content_hash.clone());
        self.compressions.push(record);
    }

    pub fn flush_moves(&self) -> Result<()> {
        write_array(&self.moved_file, &self.moves)
    }

    pub fn flush_compressions(&self) -> Result<()> {
        write_array(&self.compressed_file, &self.compressions)
    }

    pub fn moves(&self) -> &[MoveRecord] {
        &self.moves
    }

    pub fn compressions(&self) -> &[CompressionRecord] {
        &self.compressions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::paths::{ensure_maintenance_dir, resolve_paths};
    use tempfile::tempdir;

    fn sample_move(name: &str) -> MoveRecord {
        MoveRecord {
            asset_name: name.to_string(),
            source_path: format!("/vault/{name}"),
            destination_path: format!("/vault/notes/assets/{name}"),
            content_hash: "deadbeef".to_string(),
            timestamp: "2025-01-02T03:04:05.000Z".to_string(),
        }
    }

    #[test]
    fn first_load_creates_empty_ledger_files() {
        let tmp = tempdir().expect("tempdir");
        let paths = resolve_paths(tmp.path());
        ensure_maintenance_dir(&paths).expect("logs dir");

        let ledger = Ledger::load(&paths).expect("load");
        assert!(paths.moved_ledger_file.exists());
        assert!(paths.compressed_ledger_file.exists());
        assert!(ledger.moves().is_empty());
        assert!(ledger.compressions().is_empty());
    }

    #[test]
    fn appends_survive_a_reload() {
        let tmp = tempdir().expect("tempdir");
        let paths = resolve_paths(tmp.path());
        ensure_maintenance_dir(&paths).expect("logs dir");

        let mut ledger = Ledger::load(&paths).expect("load");
        ledger.append_move(sample_move("a.png"));
        ledger.flush_moves().expect("flush moves");
        ledger.append_compression(CompressionRecord {
            path: "/vault/a.png".to_string(),
            content_hash: "cafe".to_string(),
            old_size: 100,
            new_size: 40,
            timestamp: "2025-01-02T03:04:05.000Z".to_string(),
        });
        ledger.flush_compressions().expect("flush compressions");

        let reloaded = Ledger::load(&paths).expect("reload");
        assert!(reloaded.contains_move("a.png"));
        assert!(!reloaded.contains_move("b.png"));
        assert!(reloaded.contains_compression("cafe"));
        assert_eq!(reloaded.moves().len(), 1);
        assert_eq!(reloaded.compressions().len(), 1);
    }

    #[test]
    fn membership_index_tracks_unflushed_appends() {
        let tmp = tempdir().expect("tempdir");
        let paths = resolve_paths(tmp.path());
        ensure_maintenance_dir(&paths).expect("logs dir");

        let mut ledger = Ledger::load(&paths).expect("load");
        assert!(!ledger.contains_compression("abc"));
        ledger.append_compression(CompressionRecord {
            path: "p".to_string(),
            content_hash: "abc".to_string(),
            old_size: 2,
            new_size: 1,
            timestamp: "2025-01-02T03:04:05.000Z".to_string(),
        });
        assert!(ledger.contains_compression("abc"));
    }

    #[test]
    fn non_array_ledger_is_a_corrupt_ledger_error() {
        let tmp = tempdir().expect("tempdir");
        let paths = resolve_paths(tmp.path());
        ensure_maintenance_dir(&paths).expect("logs dir");
        fs::write(&paths.moved_ledger_file, "{\"not\": \"an array\"}").expect("write");

        let err = Ledger::load(&paths).expect_err("must fail");
        assert!(err.to_string().contains("not a valid record array"));
    }

    #[test]
    fn read_only_accessors_do_not_create_files() {
        let tmp = tempdir().expect("tempdir");
        let paths = resolve_paths(tmp.path());

        let moves = read_move_records(&paths.moved_ledger_file).expect("read");
        assert!(moves.is_empty());
        assert!(!paths.moved_ledger_file.exists());
    }
}
