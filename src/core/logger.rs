//! Run log.
//!
//! Every decision the engine takes is recorded as a [`LogEvent`]. Events are
//! kept in memory, mirrored to `tracing`, optionally echoed to stdout and
//! persisted line by line as `[YYYY-MM-DD HH:MM:SS] LEVEL: message`.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, LineWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};

use super::{PluginId, RunConfig, Version};
use crate::compare::ComparisonReport;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Severity of a log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    /// What a dry run would have changed.
    DryRun,
}

impl LogLevel {
    /// Label used in persisted lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::DryRun => "DRY-RUN",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the run log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub timestamp: NaiveDateTime,
    pub level: LogLevel,
    pub message: String,
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.level,
            self.message
        )
    }
}

/// Leveled, append-only log for one run.
#[derive(Debug)]
pub struct RunLogger {
    /// Persistent sink, if logging to a file
    file: Option<LineWriter<File>>,

    /// Where `file` writes
    path: Option<PathBuf>,

    /// Persist only comparison reports of modified plugins
    diffs_only: bool,

    /// Print events to stdout
    echo: bool,

    /// Every event emitted so far
    events: Vec<LogEvent>,
}

impl RunLogger {
    /// A logger that keeps events in memory only.
    pub fn memory() -> Self {
        Self { file: None, path: None, diffs_only: false, echo: false, events: Vec::new() }
    }

    /// A logger persisting to `path`.
    ///
    /// An existing log is truncated, or renamed with a timestamp suffix when
    /// `save_old_logs` is set.
    pub fn open(path: &Path, save_old_logs: bool, diffs_only: bool) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        if save_old_logs {
            if let Some(rotated) = rotate_log(path)? {
                tracing::debug!(from = %path.display(), to = %rotated.display(), "Rotated old log");
            }
        }

        let file = OpenOptions::new().create(true).write(true).truncate(true).open(path)?;

        Ok(Self {
            file: Some(LineWriter::new(file)),
            path: Some(path.to_path_buf()),
            diffs_only,
            echo: false,
            events: Vec::new(),
        })
    }

    /// Build the logger a run configuration asks for.
    pub fn from_config(config: &RunConfig) -> io::Result<Self> {
        if config.no_log {
            return Ok(Self::memory());
        }
        Self::open(&config.log_path(), config.save_old_logs, config.save_diffs_only)
    }

    /// Also print every event to stdout.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Log file in use, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Events emitted so far, in order.
    pub fn events(&self) -> &[LogEvent] {
        &self.events
    }

    /// Record an event.
    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        let event = LogEvent { timestamp: Local::now().naive_local(), level, message: message.into() };

        match level {
            LogLevel::Info | LogLevel::DryRun => {
                tracing::info!(kind = %level, "{}", event.message);
            }
            LogLevel::Warning => tracing::warn!("{}", event.message),
            LogLevel::Error => tracing::error!("{}", event.message),
        }

        let line = event.to_string();
        if self.echo {
            println!("{line}");
        }
        if !self.diffs_only {
            self.persist(&line);
        }

        self.events.push(event);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    pub fn dry_run(&mut self, message: impl Into<String>) {
        self.log(LogLevel::DryRun, message);
    }

    /// Record the report of a plugin that differs from upstream.
    ///
    /// Identical reports are not written. In diffs-only mode this is the
    /// only thing that reaches the log file.
    pub fn report(&mut self, plugin: &PluginId, version: &Version, report: &ComparisonReport) {
        if report.is_identical() {
            return;
        }

        let header = format!(
            "[{}] DIFF: {plugin} {version} ({} difference(s))",
            Local::now().naive_local().format(TIMESTAMP_FORMAT),
            report.difference_count()
        );
        let body = report.render();

        if self.echo {
            println!("{header}");
            print!("{body}");
        }
        self.persist(&header);
        self.persist(body.trim_end_matches('\n'));
    }

    fn persist(&mut self, text: &str) {
        let Some(file) = self.file.as_mut() else {
            return;
        };
        if let Err(e) = writeln!(file, "{text}") {
            tracing::warn!(error = %e, "Failed to write run log, disabling persistence");
            self.file = None;
        }
    }
}

/// Move an existing log aside as `<stem>-<YYYYmmdd-HHMMSS>.<ext>`.
///
/// A `-<n>` counter is appended to the stamp when a log was already rotated
/// within the same second.
pub fn rotate_log(path: &Path) -> io::Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }

    let stem = path.file_stem().map_or_else(|| "run".into(), |s| s.to_string_lossy());
    let ext = path.extension().map(|e| e.to_string_lossy());
    let stamp = Local::now().format("%Y%m%d-%H%M%S").to_string();

    let mut counter = 0u32;
    let rotated = loop {
        let base = match counter {
            0 => format!("{stem}-{stamp}"),
            n => format!("{stem}-{stamp}-{n}"),
        };
        let name = match &ext {
            Some(ext) => format!("{base}.{ext}"),
            None => base,
        };
        let candidate = path.with_file_name(name);
        if !candidate.exists() {
            break candidate;
        }
        counter += 1;
    };

    fs::rename(path, &rotated)?;
    Ok(Some(rotated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read_lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path).unwrap().lines().map(str::to_string).collect()
    }

    fn is_log_line(line: &str, level: &str, message: &str) -> bool {
        // [YYYY-MM-DD HH:MM:SS] = 21 chars
        line.len() > 22
            && line.starts_with('[')
            && &line[20..22] == "] "
            && NaiveDateTime::parse_from_str(&line[1..20], TIMESTAMP_FORMAT).is_ok()
            && line[22..] == format!("{level}: {message}")
    }

    #[test]
    fn test_level_labels() {
        assert_eq!(LogLevel::Info.as_str(), "INFO");
        assert_eq!(LogLevel::Warning.as_str(), "WARNING");
        assert_eq!(LogLevel::Error.as_str(), "ERROR");
        assert_eq!(LogLevel::DryRun.as_str(), "DRY-RUN");
    }

    #[test]
    fn test_memory_logger_keeps_order() {
        let mut logger = RunLogger::memory();
        logger.info("first");
        logger.warning("second");
        logger.dry_run("third");

        let levels: Vec<_> = logger.events().iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![LogLevel::Info, LogLevel::Warning, LogLevel::DryRun]);
        assert!(logger.path().is_none());
    }

    #[test]
    fn test_persisted_line_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs/run.log");

        let mut logger = RunLogger::open(&path, false, false).unwrap();
        logger.info("Starting run");
        logger.error("Something broke");
        drop(logger);

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert!(is_log_line(&lines[0], "INFO", "Starting run"));
        assert!(is_log_line(&lines[1], "ERROR", "Something broke"));
    }

    #[test]
    fn test_truncates_without_save_old_logs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.log");
        fs::write(&path, "old content\n").unwrap();

        let mut logger = RunLogger::open(&path, false, false).unwrap();
        logger.info("fresh");
        drop(logger);

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("INFO: fresh"));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_save_old_logs_rotates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.log");
        fs::write(&path, "old content\n").unwrap();

        let logger = RunLogger::open(&path, true, false).unwrap();
        drop(logger);

        let rotated: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name != "run.log")
            .collect();
        assert_eq!(rotated.len(), 1);
        assert!(rotated[0].starts_with("run-") && rotated[0].ends_with(".log"));
        assert_eq!(fs::read_to_string(dir.path().join(&rotated[0])).unwrap(), "old content\n");
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_rotate_twice_keeps_both_logs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.log");

        fs::write(&path, "first run\n").unwrap();
        let first = rotate_log(&path).unwrap().unwrap();
        fs::write(&path, "second run\n").unwrap();
        let second = rotate_log(&path).unwrap().unwrap();

        assert_ne!(first, second);
        assert!(!path.exists());
        assert_eq!(fs::read_to_string(&first).unwrap(), "first run\n");
        assert_eq!(fs::read_to_string(&second).unwrap(), "second run\n");
        assert!(second.extension().is_some_and(|ext| ext == "log"));
    }

    #[test]
    fn test_rotate_missing_log() {
        let dir = TempDir::new().unwrap();
        assert_eq!(rotate_log(&dir.path().join("none.log")).unwrap(), None);
    }

    #[test]
    fn test_diffs_only_persists_reports() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.log");
        let report = ComparisonReport::new(
            vec!["custom.css".into()],
            vec![],
            vec![],
            String::new(),
        );

        let mut logger = RunLogger::open(&path, false, true).unwrap();
        logger.info("not persisted");
        logger.report(&"demo".into(), &"1.0".into(), &report);
        logger.report(
            &"clean".into(),
            &"1.0".into(),
            &ComparisonReport::new(vec![], vec![], vec![], String::new()),
        );
        drop(logger);

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("DIFF: demo 1.0 (1 difference(s))"));
        assert_eq!(lines[1], "Only in local: custom.css");
    }
}
