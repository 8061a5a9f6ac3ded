use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

fn is_hidden(entry: &fs::DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn collect(root: &Path, ext: &str, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries =
        fs::read_dir(root).with_context(|| format!("failed to read {}", root.display()))?;
    for entry in entries {
        let entry = entry?;
        // Dot-entries keep `.logs/` and `.obsidian/` out of maintenance scope.
        if is_hidden(&entry) {
            continue;
        }
        let path = entry.path();
        if path.is_dir() {
            collect(&path, ext, out)?;
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(ext))
        {
            out.push(path);
        }
    }
    Ok(())
}

/// Recursively enumerate files with the given extension (case-insensitive),
/// sorted for deterministic processing order.
pub fn files_with_extension(root: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    collect(root, ext, &mut out)?;
    out.sort();
    Ok(out)
}
