// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Compiled artifacts and compile logs

use super::node::Node;
use crate::cache::Fingerprint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a compile log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Informational
    Info,
    /// Non-fatal problem, e.g. a selector that matched nothing
    Warning,
    /// A patch that could not be applied and was skipped
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warning => write!(f, "warning"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// One compile log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Severity
    pub level: LogLevel,
    /// Human-readable message
    pub message: String,
    /// Patch that produced the entry (`extension 12`, `child_view#0`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "[{}] {}: {}", self.level, source, self.message),
            None => write!(f, "[{}] {}", self.level, self.message),
        }
    }
}

/// Ordered list of compile diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompileLog {
    entries: Vec<LogEntry>,
}

impl CompileLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry
    pub fn push(&mut self, level: LogLevel, source: Option<&str>, message: impl Into<String>) {
        self.entries.push(LogEntry {
            level,
            message: message.into(),
            source: source.map(str::to_string),
        });
    }

    /// Append an info entry
    pub fn info(&mut self, source: Option<&str>, message: impl Into<String>) {
        self.push(LogLevel::Info, source, message);
    }

    /// Append a warning entry
    pub fn warning(&mut self, source: Option<&str>, message: impl Into<String>) {
        self.push(LogLevel::Warning, source, message);
    }

    /// Append an error entry
    pub fn error(&mut self, source: Option<&str>, message: impl Into<String>) {
        self.push(LogLevel::Error, source, message);
    }

    /// All entries in emission order
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Entries of one level
    pub fn at_level(&self, level: LogLevel) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |entry| entry.level == level)
    }

    /// Number of entries of one level
    pub fn count(&self, level: LogLevel) -> usize {
        self.at_level(level).count()
    }

    /// Whether no warnings or errors were recorded
    pub fn is_clean(&self) -> bool {
        self.entries.iter().all(|entry| entry.level == LogLevel::Info)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cached, fully-resolved output of one view.
///
/// Derived data: never hand-edited and never a source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledArtifact {
    /// Compiled view
    pub view_name: String,
    /// Result tree
    pub compiled_content: Node,
    /// Fingerprint of every input that shaped the result
    pub input_fingerprint: Fingerprint,
    /// Extensions that applied, in application order
    pub applied_extension_ids: Vec<u64>,
    /// Diagnostics emitted while compiling
    pub compile_log: CompileLog,
    /// Compilation timestamp
    pub compiled_at: DateTime<Utc>,
    /// Wall time spent compiling
    pub compile_duration_ms: u64,
}
