use crate::vault::paths::VaultPaths;
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Reserved run-boundary messages. The reporter pairs these positionally to
/// reconstruct run intervals, so the wire form must stay stable.
pub const RUN_STARTED: &str = "===== Run started =====";
pub const RUN_FINISHED: &str = "===== Run finished =====";

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Append-only sink for the human-readable run log. Every line is also
/// echoed to stdout, as the vault owner watches runs interactively.
#[derive(Debug, Clone)]
pub struct RunLog {
    file: PathBuf,
    only_actions: bool,
}

impl RunLog {
    pub fn open(paths: &VaultPaths, only_actions: bool) -> Result<Self> {
        if !paths.run_log_file.exists() {
            fs::write(&paths.run_log_file, "")
                .with_context(|| format!("failed to create {}", paths.run_log_file.display()))?;
        }
        Ok(Self {
            file: paths.run_log_file.clone(),
            only_actions,
        })
    }

    fn append(&self, message: &str) -> Result<()> {
        let line = format!("[{}] {message}\n", now_rfc3339());
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file)
            .with_context(|| format!("failed to open {}", self.file.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("failed to write {}", self.file.display()))?;
        print!("{line}");
        Ok(())
    }

    /// An action changed the vault (or failed trying); always logged.
    pub fn action(&self, message: &str) -> Result<()> {
        self.append(message)
    }

    /// Progress chatter; suppressed under `--only-actions`.
    pub fn info(&self, message: &str) -> Result<()> {
        if self.only_actions {
            return Ok(());
        }
        self.append(message)
    }

    pub fn run_started(&self) -> Result<()> {
        self.append(RUN_STARTED)
    }

    pub fn run_finished(&self) -> Result<()> {
        self.append(RUN_FINISHED)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    RunStarted,
    RunFinished,
    Message(String),
}

/// A run-log line parsed into a typed event at the reading boundary, so the
/// run-pairing logic never string-matches free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub at: DateTime<Utc>,
    pub kind: EventKind,
}

/// Parse one `[rfc3339] message` line; anything unparsable is skipped by the
/// caller rather than failing the whole report.
pub fn parse_line(line: &str) -> Option<LogEvent> {
    let rest = line.strip_prefix('[')?;
    let (stamp, message) = rest.split_once("] ")?;
    let at = DateTime::parse_from_rfc3339(stamp).ok()?.with_timezone(&Utc);
    let kind = match message.trim_end() {
        RUN_STARTED => EventKind::RunStarted,
        RUN_FINISHED => EventKind::RunFinished,
        other => EventKind::Message(other.to_string()),
    };
    Some(LogEvent { at, kind })
}

pub fn read_events(path: &Path) -> Result<Vec<LogEvent>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(raw.lines().filter_map(parse_line).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::paths::{ensure_maintenance_dir, resolve_paths};
    use tempfile::tempdir;

    #[test]
    fn parse_line_classifies_markers() {
        let started = parse_line("[2025-01-02T03:04:05.678Z] ===== Run started =====")
            .expect("parse started");
        assert_eq!(started.kind, EventKind::RunStarted);

        let finished = parse_line("[2025-01-02T03:04:06.000Z] ===== Run finished =====")
            .expect("parse finished");
        assert_eq!(finished.kind, EventKind::RunFinished);

        let other = parse_line("[2025-01-02T03:04:05.700Z] Moved image: a -> b").expect("parse");
        assert_eq!(other.kind, EventKind::Message("Moved image: a -> b".into()));
    }

    #[test]
    fn parse_line_rejects_garbage() {
        assert_eq!(parse_line("no timestamp here"), None);
        assert_eq!(parse_line("[not-a-date] hello"), None);
        assert_eq!(parse_line(""), None);
    }

    #[test]
    fn appended_lines_round_trip_through_the_parser() {
        let tmp = tempdir().expect("tempdir");
        let paths = resolve_paths(tmp.path());
        ensure_maintenance_dir(&paths).expect("logs dir");
        let log = RunLog::open(&paths, false).expect("open");

        log.run_started().expect("started");
        log.action("Moved image: x -> y").expect("action");
        log.run_finished().expect("finished");

        let events = read_events(&paths.run_log_file).expect("read");
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].kind, EventKind::RunStarted);
        assert_eq!(events[1].kind, EventKind::Message("Moved image: x -> y".into()));
        assert_eq!(events[2].kind, EventKind::RunFinished);
    }

    #[test]
    fn info_lines_are_suppressed_under_only_actions() {
        let tmp = tempdir().expect("tempdir");
        let paths = resolve_paths(tmp.path());
        ensure_maintenance_dir(&paths).expect("logs dir");
        let log = RunLog::open(&paths, true).expect("open");

        log.info("Processing markdown file: a.md").expect("info");
        log.action("Moved image: x -> y").expect("action");

        let events = read_events(&paths.run_log_file).expect("read");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Message("Moved image: x -> y".into()));
    }
}
