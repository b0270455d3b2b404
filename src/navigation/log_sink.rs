//! Navigation log sink
//!
//! One [`TickRecord`] per tick, written as a JSON line. Sink failures are
//! handled by [`NavLogger`] according to the configured [`LogFailurePolicy`]
//! and never reach the control loop.

use crate::common::{Pose2D, Stamp, VelocityCommand};
use crate::config::LogFailurePolicy;
use crate::error::{NavError, Result};
use crate::navigation::state::{NavState, Transition};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{error, warn};

/// A candidate as recorded in the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub command: VelocityCommand,
    pub feasible: bool,
    /// `None` when no obstacle was in reach
    pub min_clearance: Option<f64>,
    pub clearance_score: f64,
    pub progress: Option<f64>,
}

/// Everything the navigator saw and decided in one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickRecord {
    pub tick: u64,
    pub stamp: Stamp,
    pub state: NavState,
    pub outcome: String,
    pub robot_pose: Option<Pose2D>,
    pub goal: Option<Pose2D>,
    /// Obstacle points considered this tick, reference frame
    pub obstacles: Vec<[f64; 2]>,
    pub candidates: Vec<CandidateRecord>,
    pub selected: Option<usize>,
    pub command: Option<VelocityCommand>,
    pub transitions: Vec<Transition>,
}

/// Destination for tick records
pub trait TickLogSink: Send + Sync {
    fn append(&mut self, record: &TickRecord) -> Result<()>;

    fn name(&self) -> &str;
}

/// Appends JSON lines to a file
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonLinesSink {
    /// Open `path` for appending, creating it if needed
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| NavError::LogSink(format!("cannot open {}: {}", path.display(), e)))?;
        Ok(JsonLinesSink {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TickLogSink for JsonLinesSink {
    fn append(&mut self, record: &TickRecord) -> Result<()> {
        let line = serde_json::to_string(record).map_err(|e| NavError::LogSink(e.to_string()))?;
        writeln!(self.writer, "{}", line).map_err(|e| NavError::LogSink(e.to_string()))?;
        self.writer.flush().map_err(|e| NavError::LogSink(e.to_string()))
    }

    fn name(&self) -> &str {
        "JsonLines"
    }
}

/// Keeps records in memory; clones share the same storage
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<TickRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything appended so far
    pub fn records(&self) -> Vec<TickRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl TickLogSink for MemorySink {
    fn append(&mut self, record: &TickRecord) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| NavError::LogSink("memory sink poisoned".to_string()))?;
        records.push(record.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "Memory"
    }
}

/// Applies the failure policy around a sink
pub struct NavLogger {
    sink: Box<dyn TickLogSink>,
    policy: LogFailurePolicy,
    consecutive_failures: u32,
    total_failures: u64,
    enabled: bool,
}

impl std::fmt::Debug for NavLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("NavLogger")
            .field("sink", &self.sink.name())
            .field("policy", &self.policy)
            .field("consecutive_failures", &self.consecutive_failures)
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl NavLogger {
    /// Create a new navigation logger
    pub fn new(sink: Box<dyn TickLogSink>, policy: LogFailurePolicy) -> Self {
        NavLogger {
            sink,
            policy,
            consecutive_failures: 0,
            total_failures: 0,
            enabled: true,
        }
    }

    /// Same sink under a different failure policy
    pub fn with_policy(mut self, policy: LogFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn total_failures(&self) -> u64 {
        self.total_failures
    }

    /// Write one record; returns whether it was stored
    pub fn log(&mut self, record: &TickRecord) -> bool {
        if !self.enabled {
            return false;
        }
        match self.sink.append(record) {
            Ok(()) => {
                self.consecutive_failures = 0;
                true
            }
            Err(e) => {
                self.consecutive_failures += 1;
                self.total_failures += 1;
                let give_up = match self.policy {
                    LogFailurePolicy::Disable => true,
                    LogFailurePolicy::Retry {
                        max_consecutive_failures,
                    } => self.consecutive_failures >= max_consecutive_failures,
                };
                if give_up {
                    self.enabled = false;
                    error!(
                        "Disabling navigation log sink {} after {} consecutive failures: {}",
                        self.sink.name(),
                        self.consecutive_failures,
                        e
                    );
                } else {
                    warn!("Navigation log write failed (tick {}): {}", record.tick, e);
                }
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(tick: u64) -> TickRecord {
        TickRecord {
            tick,
            stamp: tick as f64 * 0.2,
            state: NavState::Navigating,
            outcome: "executed".to_string(),
            robot_pose: Some(Pose2D::new(1.0, 2.0, 0.5)),
            goal: Some(Pose2D::new(3.0, 2.0, 0.0)),
            obstacles: vec![[1.5, 2.0]],
            candidates: vec![CandidateRecord {
                command: VelocityCommand::stop(),
                feasible: true,
                min_clearance: None,
                clearance_score: 1.0,
                progress: Some(0.25),
            }],
            selected: Some(0),
            command: Some(VelocityCommand::stop()),
            transitions: Vec::new(),
        }
    }

    #[derive(Debug)]
    struct FailingSink;

    impl TickLogSink for FailingSink {
        fn append(&mut self, _record: &TickRecord) -> Result<()> {
            Err(NavError::LogSink("disk full".to_string()))
        }

        fn name(&self) -> &str {
            "Failing"
        }
    }

    #[test]
    fn test_json_lines_written_per_tick() {
        let path = std::env::temp_dir().join(format!("nav_log_sink_{}.jsonl", std::process::id()));
        let _ = std::fs::remove_file(&path);
        {
            let mut sink = JsonLinesSink::create(&path).unwrap();
            sink.append(&record(1)).unwrap();
            sink.append(&record(2)).unwrap();
        }
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: TickRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed, record(2));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_memory_sink_shares_records() {
        let sink = MemorySink::new();
        let mut logger = NavLogger::new(Box::new(sink.clone()), LogFailurePolicy::Disable);
        assert!(logger.log(&record(1)));
        assert_eq!(sink.records().len(), 1);
    }

    #[test]
    fn test_disable_policy_stops_after_first_failure() {
        let mut logger = NavLogger::new(Box::new(FailingSink), LogFailurePolicy::Disable);
        assert!(!logger.log(&record(1)));
        assert!(!logger.is_enabled());
        assert!(!logger.log(&record(2)));
        assert_eq!(logger.total_failures(), 1);
    }

    #[test]
    fn test_retry_policy_gives_up_after_limit() {
        let policy = LogFailurePolicy::Retry {
            max_consecutive_failures: 3,
        };
        let mut logger = NavLogger::new(Box::new(FailingSink), policy);
        logger.log(&record(1));
        logger.log(&record(2));
        assert!(logger.is_enabled());
        logger.log(&record(3));
        assert!(!logger.is_enabled());
    }
}
