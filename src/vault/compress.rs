use crate::error::FatalError;
use crate::vault::config::TidyConfig;
use crate::vault::identity::hash_bytes;
use crate::vault::ledger::{CompressionRecord, Ledger};
use crate::vault::paths::VaultPaths;
use crate::vault::runlog::{RunLog, now_rfc3339};
use crate::vault::walk::files_with_extension;
use anyhow::{Context, Result, bail};
use regex::Regex;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::OnceLock;

/// The opaque lossy transform. The orchestrator never cares how bytes get
/// smaller, only that it receives the full transformed stream or an error.
pub trait Recompress {
    fn recompress(&self, bytes: &[u8], quality: u8) -> Result<Vec<u8>>;
}

/// Production codec: pipes bytes through an external `pngquant` binary.
#[derive(Debug, Clone)]
pub struct PngquantCodec {
    bin: PathBuf,
}

impl PngquantCodec {
    /// Resolve the binary once, before the pass. A missing recompressor is a
    /// setup-level fatal error, not one advisory failure per image.
    pub fn resolve(cfg: &TidyConfig) -> Result<Self> {
        if let Some(bin) = &cfg.pngquant_bin {
            if bin.is_file() {
                return Ok(Self { bin: bin.clone() });
            }
            return Err(FatalError::MissingRecompressor(bin.display().to_string()).into());
        }
        match which::which("pngquant") {
            Ok(bin) => Ok(Self { bin }),
            Err(_) => Err(FatalError::MissingRecompressor(
                "pngquant not found on PATH; set VAULT_TIDY_PNGQUANT or pass --pngquant".to_string(),
            )
            .into()),
        }
    }
}

impl Recompress for PngquantCodec {
    fn recompress(&self, bytes: &[u8], quality: u8) -> Result<Vec<u8>> {
        let mut child = Command::new(&self.bin)
            .arg(format!("--quality=0-{quality}"))
            .args(["--speed", "1", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to run {}", self.bin.display()))?;

        let mut stdin = child.stdin.take().context("recompressor stdin unavailable")?;
        stdin.write_all(bytes).context("failed to stream image to recompressor")?;
        drop(stdin);

        let out = child
            .wait_with_output()
            .with_context(|| format!("failed to wait for {}", self.bin.display()))?;
        if !out.status.success() {
            bail!(
                "recompressor exited with {}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            );
        }
        if out.stdout.is_empty() {
            bail!("recompressor produced no output");
        }
        Ok(out.stdout)
    }
}

fn sidecar_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"_copy_\d{4}-\d{2}-\d{2}T\d{2}-\d{2}-\d{2}-\d{3}Z$")
            .expect("sidecar regex is valid")
    })
}

/// Timestamp-qualified sidecar name next to the original, e.g.
/// `pic_copy_2025-01-02T03-04-05-678Z.png`.
pub fn sidecar_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("png");
    let stamp = now_rfc3339().replace([':', '.'], "-");
    path.with_file_name(format!("{stem}_copy_{stamp}.{ext}"))
}

/// Stray sidecars from an interrupted pass are excluded from discovery by
/// name pattern; they stay on disk as manual-recovery backups.
pub fn is_sidecar(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|stem| sidecar_regex().is_match(stem))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CompressOutcome {
    pub scanned: usize,
    pub compressed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub old_bytes: u64,
    pub new_bytes: u64,
}

enum ItemOutcome {
    Skipped,
    Compressed { old_size: u64, new_size: u64 },
}

/// Copy-compress-replace for one image.
///
/// The sidecar copy is written before the original is ever touched, so an
/// interruption at any point leaves the original either byte-identical or
/// fully replaced by transformed content. On failure the sidecar stays put;
/// it is the backup.
fn compress_one(
    image: &Path,
    quality: u8,
    codec: &dyn Recompress,
    ledger: &mut Ledger,
    log: &RunLog,
) -> Result<ItemOutcome> {
    let bytes =
        fs::read(image).with_context(|| format!("failed to read {}", image.display()))?;
    if ledger.contains_compression(&hash_bytes(&bytes)) {
        log.info(&format!("Skipping already compressed: {}", image.display()))?;
        return Ok(ItemOutcome::Skipped);
    }
    log.info(&format!("Processing: {}", image.display()))?;

    let sidecar = sidecar_path(image);
    if sidecar.exists() {
        bail!("sidecar already exists: {}", sidecar.display());
    }
    fs::write(&sidecar, &bytes)
        .with_context(|| format!("failed to copy original to {}", sidecar.display()))?;

    let original =
        fs::read(&sidecar).with_context(|| format!("failed to read {}", sidecar.display()))?;
    let compressed = codec.recompress(&original, quality)?;

    fs::write(image, &compressed)
        .with_context(|| format!("failed to overwrite {}", image.display()))?;
    fs::remove_file(&sidecar)
        .with_context(|| format!("failed to remove {}", sidecar.display()))?;

    let old_size = original.len() as u64;
    let new_size = compressed.len() as u64;
    ledger.append_compression(CompressionRecord {
        path: image.display().to_string(),
        content_hash: hash_bytes(&compressed),
        old_size,
        new_size,
        timestamp: now_rfc3339(),
    });

    log.action(&format!("Compressed and updated: {}", image.display()))?;
    Ok(ItemOutcome::Compressed { old_size, new_size })
}

/// Compression Orchestrator: walk every PNG in the vault, recompress the
/// ones whose current content hash is not yet in the ledger, and flush the
/// compression records once after the pass.
pub fn compress_images(
    paths: &VaultPaths,
    cfg: &TidyConfig,
    ledger: &mut Ledger,
    log: &RunLog,
    codec: &dyn Recompress,
) -> Result<CompressOutcome> {
    log.action("Start compressing images")?;
    let images: Vec<PathBuf> = files_with_extension(&paths.root, "png")?
        .into_iter()
        .filter(|p| !is_sidecar(p))
        .collect();
    log.info(&format!("Found {} png files", images.len()))?;

    let mut outcome = CompressOutcome::default();
    for image in &images {
        outcome.scanned += 1;
        match compress_one(image, cfg.quality, codec, ledger, log) {
            Ok(ItemOutcome::Skipped) => outcome.skipped += 1,
            Ok(ItemOutcome::Compressed { old_size, new_size }) => {
                outcome.compressed += 1;
                outcome.old_bytes += old_size;
                outcome.new_bytes += new_size;
            }
            Err(err) => {
                outcome.failed += 1;
                log.action(&format!("Error processing {}: {err:#}", image.display()))?;
            }
        }
    }

    // Batched flush: the copy-then-replace protocol already protects the
    // files themselves, and a lost flush at worst redoes one image.
    ledger.flush_compressions()?;
    Ok(outcome)
}
