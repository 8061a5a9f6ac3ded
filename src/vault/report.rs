use crate::vault::ledger::{CompressionRecord, MoveRecord};
use crate::vault::runlog::{EventKind, LogEvent};
use chrono::{DateTime, Duration, Utc};

/// Aggregate view over the compression ledger.
#[derive(Debug, Clone, Default)]
pub struct CompressionStats {
    pub total: usize,
    pub old_bytes: u64,
    pub new_bytes: u64,
    pub saved_bytes: i64,
    /// None when nothing was compressed (percentage undefined).
    pub saved_pct: Option<f64>,
    pub earliest: Option<String>,
    pub latest: Option<String>,
    pub largest_saving: Option<CompressionRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct MoveStats {
    pub total: usize,
    pub earliest: Option<String>,
    pub latest: Option<String>,
}

/// Run intervals reconstructed from the typed log events.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub completed: usize,
    pub last_duration: Option<Duration>,
    pub mean_duration: Option<Duration>,
    /// Start timestamps of the most recent completed runs, newest first,
    /// at most three.
    pub recent_starts: Vec<DateTime<Utc>>,
}

fn saving(record: &CompressionRecord) -> i64 {
    record.old_size as i64 - record.new_size as i64
}

fn timestamp_range<'a, I>(timestamps: I) -> (Option<String>, Option<String>)
where
    I: Iterator<Item = &'a str>,
{
    let mut earliest: Option<(DateTime<Utc>, &str)> = None;
    let mut latest: Option<(DateTime<Utc>, &str)> = None;
    for raw in timestamps {
        let Ok(parsed) = DateTime::parse_from_rfc3339(raw) else {
            continue;
        };
        let at = parsed.with_timezone(&Utc);
        if earliest.as_ref().is_none_or(|(best, _)| at < *best) {
            earliest = Some((at, raw));
        }
        if latest.as_ref().is_none_or(|(best, _)| at > *best) {
            latest = Some((at, raw));
        }
    }
    (
        earliest.map(|(_, raw)| raw.to_string()),
        latest.map(|(_, raw)| raw.to_string()),
    )
}

pub fn compression_stats(records: &[CompressionRecord]) -> CompressionStats {
    let old_bytes: u64 = records.iter().map(|r| r.old_size).sum();
    let new_bytes: u64 = records.iter().map(|r| r.new_size).sum();
    let saved_bytes = old_bytes as i64 - new_bytes as i64;
    let saved_pct = if old_bytes == 0 {
        None
    } else {
        Some(saved_bytes as f64 / old_bytes as f64 * 100.0)
    };

    // Strictly-greater comparison keeps the first occurrence on ties.
    let mut largest_saving: Option<&CompressionRecord> = None;
    for record in records {
        if largest_saving.is_none_or(|best| saving(record) > saving(best)) {
            largest_saving = Some(record);
        }
    }

    let (earliest, latest) = timestamp_range(records.iter().map(|r| r.timestamp.as_str()));
    CompressionStats {
        total: records.len(),
        old_bytes,
        new_bytes,
        saved_bytes,
        saved_pct,
        earliest,
        latest,
        largest_saving: largest_saving.cloned(),
    }
}

pub fn move_stats(records: &[MoveRecord]) -> MoveStats {
    let (earliest, latest) = timestamp_range(records.iter().map(|r| r.timestamp.as_str()));
    MoveStats {
        total: records.len(),
        earliest,
        latest,
    }
}

/// Pair the i-th "run started" with the i-th "run finished", by position in
/// file order. A trailing unmatched start (crash mid-run) contributes no
/// duration and is excluded from the mean.
pub fn run_stats(events: &[LogEvent]) -> RunStats {
    let starts: Vec<DateTime<Utc>> = events
        .iter()
        .filter(|e| e.kind == EventKind::RunStarted)
        .map(|e| e.at)
        .collect();
    let finishes: Vec<DateTime<Utc>> = events
        .iter()
        .filter(|e| e.kind == EventKind::RunFinished)
        .map(|e| e.at)
        .collect();

    let completed = starts.len().min(finishes.len());
    let durations: Vec<Duration> = (0..completed)
        .map(|i| finishes[i] - starts[i])
        .collect();

    let mean_duration = if completed == 0 {
        None
    } else {
        let total = durations
            .iter()
            .fold(Duration::zero(), |acc, d| acc + *d);
        Some(total / completed as i32)
    };

    let recent_starts = starts[..completed]
        .iter()
        .rev()
        .take(3)
        .copied()
        .collect();

    RunStats {
        completed,
        last_duration: durations.last().copied(),
        mean_duration,
        recent_starts,
    }
}

fn mb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

fn fmt_duration(d: Duration) -> String {
    format!("{:.1}s", d.num_milliseconds() as f64 / 1000.0)
}

/// Render the whole report as human-readable text.
pub fn render(
    compression: &CompressionStats,
    moves: &MoveStats,
    runs: &RunStats,
) -> String {
    let mut out = String::new();

    out.push_str("== Compression ==\n");
    out.push_str(&format!("images compressed: {}\n", compression.total));
    out.push_str(&format!(
        "total old size: {} bytes ({:.2} MB)\n",
        compression.old_bytes,
        mb(compression.old_bytes)
    ));
    out.push_str(&format!(
        "total new size: {} bytes ({:.2} MB)\n",
        compression.new_bytes,
        mb(compression.new_bytes)
    ));
    match compression.saved_pct {
        Some(pct) => out.push_str(&format!(
            "total saved: {} bytes ({pct:.2}%)\n",
            compression.saved_bytes
        )),
        None => out.push_str("total saved: n/a\n"),
    }
    if let Some(best) = &compression.largest_saving {
        out.push_str(&format!(
            "largest single saving: {} bytes ({})\n",
            saving(best),
            best.path
        ));
    }
    if let (Some(earliest), Some(latest)) = (&compression.earliest, &compression.latest) {
        out.push_str(&format!("first compressed: {earliest}\n"));
        out.push_str(&format!("last compressed: {latest}\n"));
    }

    out.push_str("== Moves ==\n");
    out.push_str(&format!("images moved: {}\n", moves.total));
    if let (Some(earliest), Some(latest)) = (&moves.earliest, &moves.latest) {
        out.push_str(&format!("first moved: {earliest}\n"));
        out.push_str(&format!("last moved: {latest}\n"));
    }

    out.push_str("== Runs ==\n");
    out.push_str(&format!("completed runs: {}\n", runs.completed));
    if let Some(last) = runs.last_duration {
        out.push_str(&format!("last run duration: {}\n", fmt_duration(last)));
    }
    if let Some(mean) = runs.mean_duration {
        out.push_str(&format!("average run duration: {}\n", fmt_duration(mean)));
    }
    if !runs.recent_starts.is_empty() {
        let stamps: Vec<String> = runs
            .recent_starts
            .iter()
            .map(|t| t.to_rfc3339())
            .collect();
        out.push_str(&format!("recent runs: {}\n", stamps.join(", ")));
    }

    out
}
