//! Hash-chained record of gate and credential events for one store.
//!
//! Each line is a JSON entry whose `hash` covers its own fields plus the
//! previous entry's hash. Entries name usernames and outcomes only; secrets
//! and master passwords never reach the log.

use crate::constants;
use crate::util::fs as store_fs;
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Bytes read per step when scanning backwards for the last entry.
const TAIL_CHUNK: u64 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    /// Master password set on a new store.
    Init,
    Authenticate,
    Add,
    Get,
    Delete,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Init => "init",
            AuditAction::Authenticate => "authenticate",
            AuditAction::Add => "add",
            AuditAction::Get => "get",
            AuditAction::Delete => "delete",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_hash: Option<String>,
    pub hash: String,
}

impl AuditEntry {
    /// SHA-256 over length-prefixed fields, so no field can bleed into the next.
    fn digest(&self) -> String {
        let timestamp = self.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true);
        let outcome = if self.success { "ok" } else { "failed" };
        let fields = [
            self.prev_hash.as_deref().unwrap_or(""),
            timestamp.as_str(),
            self.action.as_str(),
            self.actor.as_str(),
            self.username.as_deref().unwrap_or(""),
            outcome,
        ];
        let mut hasher = Sha256::new();
        for field in fields {
            hasher.update((field.len() as u64).to_be_bytes());
            hasher.update(field.as_bytes());
        }
        format!("{:064x}", hasher.finalize())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainProblem {
    /// Line is not a parseable entry.
    Unreadable { line: usize },
    /// Entry fields no longer match its hash.
    Altered { line: usize },
    /// `prev_hash` does not point at the entry before it.
    BrokenLink { line: usize },
}

impl fmt::Display for ChainProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainProblem::Unreadable { line } => write!(f, "line {}: unreadable entry", line),
            ChainProblem::Altered { line } => write!(f, "line {}: entry altered", line),
            ChainProblem::BrokenLink { line } => {
                write!(f, "line {}: does not follow the previous entry", line)
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct ChainReport {
    pub entries: usize,
    pub problems: Vec<ChainProblem>,
}

impl ChainReport {
    pub fn is_intact(&self) -> bool {
        self.problems.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an event attributed to the invoking user.
    pub fn record(&self, action: AuditAction, username: Option<&str>, success: bool) -> Result<()> {
        self.record_as(action, username, success, &current_actor())
    }

    pub fn record_as(
        &self,
        action: AuditAction,
        username: Option<&str>,
        success: bool,
        actor: &str,
    ) -> Result<()> {
        let mut entry = AuditEntry {
            timestamp: Utc::now(),
            action,
            actor: actor.to_string(),
            username: username.map(str::to_string),
            success,
            prev_hash: self.last_hash()?,
            hash: String::new(),
        };
        entry.hash = entry.digest();

        let mut line = serde_json::to_string(&entry).context("encode audit entry")?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open audit log {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("append to {}", self.path.display()))?;
        store_fs::set_permissions(&self.path, constants::AUDIT_LOG_MODE)
            .with_context(|| format!("set permissions on {}", self.path.display()))
    }

    /// Parsed entries, oldest first, keeping only the newest `limit` if given.
    pub fn entries(&self, limit: Option<usize>) -> Result<Vec<AuditEntry>> {
        let mut entries = Vec::new();
        let mut skipped = 0usize;
        for (_, line) in self.lines()? {
            match serde_json::from_str::<AuditEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(_) => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::warn!(skipped, path = %self.path.display(), "unreadable audit lines");
        }
        if let Some(limit) = limit {
            let excess = entries.len().saturating_sub(limit);
            entries.drain(..excess);
        }
        Ok(entries)
    }

    /// Walk the whole log checking every hash and link.
    pub fn verify(&self) -> Result<ChainReport> {
        let mut report = ChainReport::default();
        let mut expected_prev: Option<String> = None;

        for (line_no, line) in self.lines()? {
            report.entries += 1;
            let Ok(entry) = serde_json::from_str::<AuditEntry>(&line) else {
                report.problems.push(ChainProblem::Unreadable { line: line_no });
                expected_prev = Some(raw_line_hash(line.as_bytes()));
                continue;
            };
            if entry.digest() != entry.hash {
                report.problems.push(ChainProblem::Altered { line: line_no });
            }
            if entry.prev_hash != expected_prev {
                report.problems.push(ChainProblem::BrokenLink { line: line_no });
            }
            expected_prev = Some(entry.hash);
        }

        Ok(report)
    }

    /// Non-blank lines with their 1-based line numbers.
    fn lines(&self) -> Result<Vec<(usize, String)>> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("open audit log {}", self.path.display()))
            }
        };
        let mut out = Vec::new();
        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line.with_context(|| format!("read {}", self.path.display()))?;
            if !line.trim().is_empty() {
                out.push((i + 1, line));
            }
        }
        Ok(out)
    }

    /// Hash of the final entry, found by reading backwards from the end.
    fn last_hash(&self) -> Result<Option<String>> {
        let mut file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("open audit log {}", self.path.display()))
            }
        };
        let mut pos = file
            .metadata()
            .with_context(|| format!("stat {}", self.path.display()))?
            .len();
        let mut tail: Vec<u8> = Vec::new();

        loop {
            let end = tail
                .iter()
                .rposition(|b| !b.is_ascii_whitespace())
                .map_or(0, |i| i + 1);
            if let Some(nl) = tail[..end].iter().rposition(|b| *b == b'\n') {
                return Ok(Some(line_hash(&tail[nl + 1..end])));
            }
            if pos == 0 {
                return Ok((end > 0).then(|| line_hash(&tail[..end])));
            }

            let step = TAIL_CHUNK.min(pos);
            pos -= step;
            file.seek(SeekFrom::Start(pos))
                .with_context(|| format!("seek {}", self.path.display()))?;
            let mut chunk = vec![0u8; step as usize];
            file.read_exact(&mut chunk)
                .with_context(|| format!("read {}", self.path.display()))?;
            chunk.extend_from_slice(&tail);
            tail = chunk;
        }
    }
}

/// Stored hash of a line, or a hash of its raw bytes if it does not parse.
fn line_hash(line: &[u8]) -> String {
    match serde_json::from_slice::<AuditEntry>(line) {
        Ok(entry) => entry.hash,
        Err(_) => raw_line_hash(line),
    }
}

fn raw_line_hash(line: &[u8]) -> String {
    format!("{:064x}", Sha256::digest(line))
}

fn current_actor() -> String {
    match std::env::var("SUDO_USER") {
        Ok(user) if !user.is_empty() => format!("{}(sudo)", user),
        _ => std::env::var("USER").unwrap_or_else(|_| "unknown".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn test_log() -> (TempDir, AuditLog) {
        let dir = TempDir::new().unwrap();
        let log = AuditLog::new(dir.path().join("passwords.json.audit"));
        (dir, log)
    }

    #[test]
    fn test_record_and_read_back() {
        let (_dir, log) = test_log();
        log.record_as(AuditAction::Add, Some("alice"), true, "tester")
            .unwrap();
        let entries = log.entries(None).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::Add);
        assert_eq!(entries[0].username.as_deref(), Some("alice"));
        assert!(entries[0].success);
        assert!(entries[0].prev_hash.is_none());
        assert_eq!(entries[0].hash, entries[0].digest());
    }

    #[test]
    fn test_actions_serialize_lowercase() {
        let (_dir, log) = test_log();
        log.record_as(AuditAction::Init, None, true, "tester").unwrap();
        let content = fs::read_to_string(log.path()).unwrap();
        assert!(content.contains(r#""action":"init""#));
        assert!(!content.contains("username"));
    }

    #[test]
    fn test_each_entry_links_to_previous() {
        let (_dir, log) = test_log();
        log.record_as(AuditAction::Authenticate, None, true, "tester")
            .unwrap();
        log.record_as(AuditAction::Get, Some("bob"), false, "tester")
            .unwrap();
        let entries = log.entries(None).unwrap();
        assert_eq!(entries[1].prev_hash.as_deref(), Some(entries[0].hash.as_str()));
    }

    #[test]
    fn test_entries_limit_keeps_newest() {
        let (_dir, log) = test_log();
        for name in ["a", "b", "c", "d"] {
            log.record_as(AuditAction::Add, Some(name), true, "tester")
                .unwrap();
        }
        let entries = log.entries(Some(2)).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.username.as_deref()).collect();
        assert_eq!(names, vec![Some("c"), Some("d")]);
    }

    #[test]
    fn test_missing_log_is_empty_and_intact() {
        let (_dir, log) = test_log();
        assert!(log.entries(None).unwrap().is_empty());
        let report = log.verify().unwrap();
        assert_eq!(report.entries, 0);
        assert!(report.is_intact());
    }

    #[test]
    fn test_verify_intact_chain() {
        let (_dir, log) = test_log();
        log.record_as(AuditAction::Init, None, true, "tester").unwrap();
        log.record_as(AuditAction::Add, Some("bob"), true, "tester")
            .unwrap();
        log.record_as(AuditAction::Delete, Some("bob"), true, "tester")
            .unwrap();
        let report = log.verify().unwrap();
        assert_eq!(report.entries, 3);
        assert!(report.is_intact(), "problems: {:?}", report.problems);
    }

    #[test]
    fn test_verify_flags_edited_entry() {
        let (_dir, log) = test_log();
        log.record_as(AuditAction::Add, Some("bob"), true, "tester")
            .unwrap();
        log.record_as(AuditAction::Get, Some("bob"), false, "tester")
            .unwrap();

        let content = fs::read_to_string(log.path()).unwrap();
        fs::write(log.path(), content.replace(r#""success":false"#, r#""success":true"#)).unwrap();

        let report = log.verify().unwrap();
        assert_eq!(report.problems, vec![ChainProblem::Altered { line: 2 }]);
    }

    #[test]
    fn test_verify_flags_removed_entry() {
        let (_dir, log) = test_log();
        for name in ["a", "b", "c"] {
            log.record_as(AuditAction::Add, Some(name), true, "tester")
                .unwrap();
        }
        let content = fs::read_to_string(log.path()).unwrap();
        let kept: Vec<&str> = content
            .lines()
            .filter(|l| !l.contains(r#""username":"b""#))
            .collect();
        fs::write(log.path(), kept.join("\n") + "\n").unwrap();

        let report = log.verify().unwrap();
        assert_eq!(report.entries, 2);
        assert_eq!(report.problems, vec![ChainProblem::BrokenLink { line: 2 }]);
    }

    #[test]
    fn test_verify_flags_garbage_line() {
        let (_dir, log) = test_log();
        log.record_as(AuditAction::Add, Some("a"), true, "tester")
            .unwrap();
        let mut file = OpenOptions::new().append(true).open(log.path()).unwrap();
        writeln!(file, "not an entry").unwrap();
        drop(file);
        log.record_as(AuditAction::Add, Some("b"), true, "tester")
            .unwrap();

        // The entry after the garbage chains onto it, so only the garbage is flagged.
        let report = log.verify().unwrap();
        assert_eq!(report.problems, vec![ChainProblem::Unreadable { line: 2 }]);
    }

    #[test]
    fn test_tail_read_spans_chunks() {
        let (_dir, log) = test_log();
        let long_name = "u".repeat(TAIL_CHUNK as usize * 2 + 17);
        log.record_as(AuditAction::Add, Some(&long_name), true, "tester")
            .unwrap();
        for _ in 0..3 {
            log.record_as(AuditAction::Get, Some(&long_name), true, "tester")
                .unwrap();
        }
        let report = log.verify().unwrap();
        assert_eq!(report.entries, 4);
        assert!(report.is_intact(), "problems: {:?}", report.problems);
    }

    #[test]
    fn test_tail_read_ignores_trailing_blank_lines() {
        let (_dir, log) = test_log();
        log.record_as(AuditAction::Add, Some("a"), true, "tester")
            .unwrap();
        let mut file = OpenOptions::new().append(true).open(log.path()).unwrap();
        file.write_all(b"\n\n  \n").unwrap();
        drop(file);
        let first = log.entries(None).unwrap().remove(0);
        assert_eq!(log.last_hash().unwrap(), Some(first.hash));
    }
}
