//! Structured JSONL logging for sweeps and runs.
//!
//! Provides:
//! - [`LogEntry`]: canonical JSONL log record with required + optional fields.
//! - [`LogEmitter`]: writes JSONL lines to a file, stderr or a shared buffer.
//! - [`validate_log_line`]: validates a single JSONL line against the schema.
//! - [`validate_log_file`]: validates an entire JSONL file.
//!
//! Trace ids follow `<sweep_id>::<job>::<seq>`.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use regimectl_core::{Action, Regime};

// ---------------------------------------------------------------------------
// Log entry
// ---------------------------------------------------------------------------

/// Severity level for log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

/// Outcome of a run or sweep step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    Fail,
    Skip,
    Error,
}

/// Canonical structured log entry.
///
/// Required fields: `timestamp`, `trace_id`, `level`, `event`.
/// Window-level events also carry `controller_id` and `seed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    // Required
    pub timestamp: String,
    pub trace_id: String,
    pub level: LogLevel,
    pub event: String,

    // Optional
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sweep_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regime: Option<Regime>,
    /// Actions chosen for the window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<Action>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    /// Wall-clock duration of a run or sweep (milliseconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl LogEntry {
    /// Create a new log entry with required fields only.
    #[must_use]
    pub fn new(trace_id: impl Into<String>, level: LogLevel, event: impl Into<String>) -> Self {
        Self {
            timestamp: now_utc(),
            trace_id: trace_id.into(),
            level,
            event: event.into(),
            sweep_id: None,
            controller_id: None,
            seed: None,
            window_index: None,
            regime: None,
            actions: None,
            outcome: None,
            duration_ms: None,
            details: None,
        }
    }

    #[must_use]
    pub fn with_sweep(mut self, sweep_id: impl Into<String>) -> Self {
        self.sweep_id = Some(sweep_id.into());
        self
    }

    /// Attach run identity.
    #[must_use]
    pub fn with_run(mut self, controller_id: impl Into<String>, seed: i64) -> Self {
        self.controller_id = Some(controller_id.into());
        self.seed = Some(seed);
        self
    }

    /// Attach a window observation and the actions chosen for it.
    #[must_use]
    pub fn with_window(mut self, window_index: usize, regime: Regime, actions: &[Action]) -> Self {
        self.window_index = Some(window_index);
        self.regime = Some(regime);
        self.actions = Some(actions.to_vec());
        self
    }

    #[must_use]
    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    #[must_use]
    pub fn with_duration_ms(mut self, ms: u64) -> Self {
        self.duration_ms = Some(ms);
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Log emitter
// ---------------------------------------------------------------------------

/// In-memory log sink that stays readable after the emitter takes a handle.
#[derive(Debug, Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Writes structured JSONL log entries.
pub struct LogEmitter {
    writer: Box<dyn Write + Send>,
    seq: u64,
    sweep_id: String,
    job: String,
}

impl LogEmitter {
    /// Create an emitter that writes to a file.
    pub fn to_file(path: &Path, sweep_id: &str) -> std::io::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)?;
        Ok(Self::with_writer(
            Box::new(std::io::BufWriter::new(file)),
            sweep_id,
        ))
    }

    #[must_use]
    pub fn to_stderr(sweep_id: &str) -> Self {
        Self::with_writer(Box::new(std::io::stderr()), sweep_id)
    }

    /// Create an emitter over an in-memory buffer (for testing).
    #[must_use]
    pub fn to_buffer(sweep_id: &str) -> (Self, LogBuffer) {
        let buffer = LogBuffer::default();
        (Self::with_writer(Box::new(buffer.clone()), sweep_id), buffer)
    }

    fn with_writer(writer: Box<dyn Write + Send>, sweep_id: &str) -> Self {
        Self {
            writer,
            seq: 0,
            sweep_id: sweep_id.to_string(),
            job: "sweep".to_string(),
        }
    }

    #[must_use]
    pub fn sweep_id(&self) -> &str {
        &self.sweep_id
    }

    /// Set the job segment of subsequent trace ids (e.g. `hex-s7`).
    pub fn set_job(&mut self, job: impl Into<String>) {
        self.job = job.into();
    }

    /// Generate the next trace ID.
    fn next_trace_id(&mut self) -> String {
        self.seq += 1;
        format!("{}::{}::{:03}", self.sweep_id, self.job, self.seq)
    }

    /// Emit a log entry with auto-generated trace_id and sweep_id.
    pub fn emit(&mut self, level: LogLevel, event: &str) -> std::io::Result<LogEntry> {
        let trace_id = self.next_trace_id();
        let entry = LogEntry::new(&trace_id, level, event).with_sweep(&self.sweep_id);
        let line = serde_json::to_string(&entry).map_err(std::io::Error::other)?;
        writeln!(self.writer, "{line}")?;
        Ok(entry)
    }

    /// Emit a fully-populated log entry.
    pub fn emit_entry(&mut self, mut entry: LogEntry) -> std::io::Result<()> {
        if entry.trace_id.is_empty() {
            entry.trace_id = self.next_trace_id();
        }
        if entry.sweep_id.is_none() {
            entry.sweep_id = Some(self.sweep_id.clone());
        }
        let line = serde_json::to_string(&entry).map_err(std::io::Error::other)?;
        writeln!(self.writer, "{line}")
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validation error for a log line.
#[derive(Debug)]
pub struct LogValidationError {
    pub line_number: usize,
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for LogValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line {}: field '{}': {}",
            self.line_number, self.field, self.message
        )
    }
}

/// Validate a single JSONL line against the schema.
pub fn validate_log_line(
    line: &str,
    line_number: usize,
) -> Result<LogEntry, Vec<LogValidationError>> {
    let mut errors = Vec::new();
    let mut fail = |field: &str, message: String| {
        errors.push(LogValidationError {
            line_number,
            field: field.to_string(),
            message,
        });
    };

    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            fail("<json>", format!("invalid JSON: {e}"));
            return Err(errors);
        }
    };

    let Some(obj) = value.as_object() else {
        fail("<root>", "expected JSON object".to_string());
        return Err(errors);
    };

    // Required fields
    for field in ["timestamp", "trace_id", "level", "event"] {
        if !obj.contains_key(field) {
            fail(field, "required field missing".to_string());
        }
    }

    if let Some(level) = obj.get("level").and_then(|v| v.as_str())
        && !["trace", "debug", "info", "warn", "error", "fatal"].contains(&level)
    {
        fail("level", format!("invalid level: '{level}'"));
    }

    if let Some(outcome) = obj.get("outcome").and_then(|v| v.as_str())
        && !["pass", "fail", "skip", "error"].contains(&outcome)
    {
        fail("outcome", format!("invalid outcome: '{outcome}'"));
    }

    if let Some(regime) = obj.get("regime").and_then(|v| v.as_str())
        && Regime::from_label(regime).is_none()
    {
        fail("regime", format!("invalid regime: '{regime}'"));
    }

    if let Some(actions) = obj.get("actions") {
        match actions.as_array() {
            Some(list) if !list.is_empty() => {
                for action in list {
                    if action.as_str().and_then(Action::from_str_loose).is_none() {
                        fail("actions", format!("invalid action: {action}"));
                    }
                }
            }
            _ => fail("actions", "expected a non-empty array".to_string()),
        }
    }

    // Window events must say which run they belong to.
    if obj.get("window_index").is_some() {
        match obj.get("controller_id").and_then(|v| v.as_str()) {
            Some(id) if !id.trim().is_empty() => {}
            _ => fail(
                "controller_id",
                "window events must include non-empty controller_id".to_string(),
            ),
        }
        if !obj.get("seed").is_some_and(serde_json::Value::is_i64) {
            fail("seed", "window events must include an integer seed".to_string());
        }
    }

    if let Some(trace_id) = obj.get("trace_id").and_then(|v| v.as_str())
        && !trace_id.contains("::")
    {
        fail(
            "trace_id",
            format!("trace_id should follow <sweep_id>::<job>::<seq> format, got: '{trace_id}'"),
        );
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    serde_json::from_value::<LogEntry>(value).map_err(|e| {
        vec![LogValidationError {
            line_number,
            field: "<deserialization>".to_string(),
            message: format!("failed to deserialize: {e}"),
        }]
    })
}

/// Validate an entire JSONL file.
///
/// Returns the total line count and any validation errors found.
pub fn validate_log_file(path: &Path) -> Result<(usize, Vec<LogValidationError>), std::io::Error> {
    let content = std::fs::read_to_string(path)?;
    let mut all_errors = Vec::new();
    let mut line_count = 0;

    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        line_count += 1;
        if let Err(errs) = validate_log_line(line, i + 1) {
            all_errors.extend(errs);
        }
    }

    Ok((line_count, all_errors))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn now_utc() -> String {
    let duration = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();
    // Approximate calendar fields; ordering and time-of-day are exact.
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        1970 + secs / 31_557_600,
        (secs % 31_557_600) / 2_629_800 + 1,
        (secs % 2_629_800) / 86400 + 1,
        (secs % 86400) / 3600,
        (secs % 3600) / 60,
        secs % 60,
        millis,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_entry_serializes_required_fields() {
        let entry = LogEntry::new("sw-1::hex-s0::001", LogLevel::Info, "run_start");
        let json = entry.to_jsonl().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed["timestamp"].is_string());
        assert_eq!(parsed["trace_id"], "sw-1::hex-s0::001");
        assert_eq!(parsed["level"], "info");
        assert_eq!(parsed["event"], "run_start");
        assert!(parsed.get("controller_id").is_none());
        assert!(parsed.get("window_index").is_none());
    }

    #[test]
    fn window_entry_carries_run_context() {
        let entry = LogEntry::new("sw-1::hex-s0::002", LogLevel::Warn, "controller_fault")
            .with_run("wiring", 7)
            .with_window(3, Regime::Magma, &[Action::Hold])
            .with_details(serde_json::json!({"fault": "decision graph failed"}));
        let json = entry.to_jsonl().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["controller_id"], "wiring");
        assert_eq!(parsed["seed"], 7);
        assert_eq!(parsed["window_index"], 3);
        assert_eq!(parsed["regime"], "magma");
        assert_eq!(parsed["actions"][0], "Hold");
        assert!(validate_log_line(&json, 1).is_ok());
    }

    #[test]
    fn validate_missing_required_field() {
        let json = r#"{"timestamp":"2026-01-01T00:00:00Z","level":"info","event":"test"}"#;
        let errors = validate_log_line(json, 1).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "trace_id"));
    }

    #[test]
    fn validate_invalid_level() {
        let json = r#"{"timestamp":"2026-01-01T00:00:00Z","trace_id":"a::b::c","level":"critical","event":"test"}"#;
        let errors = validate_log_line(json, 1).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "level"));
    }

    #[test]
    fn validate_invalid_json() {
        let errors = validate_log_line("not json at all", 1).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "<json>"));
    }

    #[test]
    fn validate_bad_trace_id_format() {
        let json = r#"{"timestamp":"2026-01-01T00:00:00Z","trace_id":"no-separator","level":"info","event":"test"}"#;
        let errors = validate_log_line(json, 1).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "trace_id"));
    }

    #[test]
    fn validate_window_event_without_run_identity() {
        let json = r#"{"timestamp":"2026-01-01T00:00:00Z","trace_id":"a::b::001","level":"warn","event":"controller_fault","window_index":2,"regime":"ok","actions":["Hold"]}"#;
        let errors = validate_log_line(json, 4).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "controller_id"));
        assert!(errors.iter().any(|e| e.field == "seed"));
        assert!(errors.iter().all(|e| e.line_number == 4));
    }

    #[test]
    fn validate_unknown_regime_and_action() {
        let json = r#"{"timestamp":"2026-01-01T00:00:00Z","trace_id":"a::b::001","level":"info","event":"window","controller_id":"hex","seed":1,"window_index":0,"regime":"lukewarm","actions":["Jump"]}"#;
        let errors = validate_log_line(json, 1).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "regime"));
        assert!(errors.iter().any(|e| e.field == "actions"));
    }

    #[test]
    fn emitter_generates_sequential_trace_ids() {
        let (mut emitter, buffer) = LogEmitter::to_buffer("sw-42");
        let e1 = emitter.emit(LogLevel::Info, "sweep_start").unwrap();
        emitter.set_job("hex-s3");
        let e2 = emitter.emit(LogLevel::Info, "run_complete").unwrap();
        assert_eq!(e1.trace_id, "sw-42::sweep::001");
        assert_eq!(e2.trace_id, "sw-42::hex-s3::002");
        assert_eq!(e2.sweep_id.as_deref(), Some("sw-42"));
        let lines = buffer.lines();
        assert_eq!(lines.len(), 2);
        for (i, line) in lines.iter().enumerate() {
            assert!(validate_log_line(line, i + 1).is_ok());
        }
    }

    #[test]
    fn stderr_emitter_numbers_traces_like_any_other() {
        let mut emitter = LogEmitter::to_stderr("sw-err");
        emitter.set_job("hex-s3");
        let entry = emitter.emit(LogLevel::Debug, "sweep_start").unwrap();
        assert_eq!(entry.trace_id, "sw-err::hex-s3::001");
        assert_eq!(emitter.sweep_id(), "sw-err");
        emitter.flush().unwrap();
    }

    #[test]
    fn emit_entry_fills_trace_and_sweep() {
        let (mut emitter, buffer) = LogEmitter::to_buffer("sw-9");
        emitter
            .emit_entry(LogEntry::new("", LogLevel::Info, "run_complete").with_run("null", 1))
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&buffer.lines()[0]).unwrap();
        assert_eq!(parsed["trace_id"], "sw-9::sweep::001");
        assert_eq!(parsed["sweep_id"], "sw-9");
    }

    #[test]
    fn roundtrip_deserialization() {
        let entry = LogEntry::new("sw-1::null-s1::001", LogLevel::Warn, "window_stressed")
            .with_run("null", -3)
            .with_duration_ms(25);
        let json = entry.to_jsonl().unwrap();
        let restored: LogEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.trace_id, "sw-1::null-s1::001");
        assert_eq!(restored.level, LogLevel::Warn);
        assert_eq!(restored.seed, Some(-3));
        assert_eq!(restored.duration_ms, Some(25));
    }
}
