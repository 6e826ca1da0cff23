//! Job-descriptor file reader.
//!
//! The input is UTF-8, line-oriented. Lines starting with `#` and blank lines
//! are skipped. Each data line carries four or five tab-separated integers:
//!
//! ```text
//! id  arrival  runtime  priority  [memsize]
//! ```
//!
//! When `memsize` is absent it defaults to `runtime` — the four-field layout
//! predates the memory manager and is still accepted. Ids must be unique and
//! positive; `runtime` and `memsize` must be positive; `arrival` and
//! `priority` may be zero. The rows may appear in any order — the driver
//! sorts by arrival before feeding the clock.

use std::path::Path;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::info;

use crate::job::Job;

/// A rejected input file, with the offending line where one exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// A data line that is not 4 or 5 integer fields.
    #[error("line {line}: malformed job descriptor '{content}' (expected: id arrival runtime priority [memsize])")]
    MalformedLine { line: usize, content: String },

    /// A field whose value must be ≥ 1 was 0.
    #[error("line {line}: {field} must be positive")]
    NonPositiveField { line: usize, field: &'static str },

    /// Two data lines carry the same id.
    #[error("line {line}: duplicate process id {id}")]
    DuplicateId { line: usize, id: u32 },
}

/// Read and parse the job file at `path`.
pub fn read_jobs(path: &Path) -> Result<Vec<Job>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot open job file: {}", path.display()))?;
    let jobs = parse_jobs(&content)
        .with_context(|| format!("invalid job file: {}", path.display()))?;
    info!(
        jobs = jobs.len(),
        path = %path.display(),
        "job descriptors read"
    );
    Ok(jobs)
}

/// Parse job descriptors out of the file content.
pub fn parse_jobs(content: &str) -> Result<Vec<Job>, InputError> {
    let mut jobs: Vec<Job> = Vec::new();
    for (idx, raw) in content.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let fields: Vec<u64> = trimmed
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<_, _>>()
            .map_err(|_| InputError::MalformedLine {
                line,
                content: trimmed.to_string(),
            })?;
        if fields.len() != 4 && fields.len() != 5 {
            return Err(InputError::MalformedLine {
                line,
                content: trimmed.to_string(),
            });
        }

        let id = u32::try_from(fields[0]).map_err(|_| InputError::MalformedLine {
            line,
            content: trimmed.to_string(),
        })?;
        let arrival = fields[1];
        let runtime = fields[2];
        let priority = u32::try_from(fields[3]).map_err(|_| InputError::MalformedLine {
            line,
            content: trimmed.to_string(),
        })?;
        let memsize = fields.get(4).copied().unwrap_or(runtime);

        if id == 0 {
            return Err(InputError::NonPositiveField { line, field: "id" });
        }
        if runtime == 0 {
            return Err(InputError::NonPositiveField {
                line,
                field: "runtime",
            });
        }
        if memsize == 0 {
            return Err(InputError::NonPositiveField {
                line,
                field: "memsize",
            });
        }
        if jobs.iter().any(|j| j.id == id) {
            return Err(InputError::DuplicateId { line, id });
        }

        jobs.push(Job {
            id,
            arrival,
            runtime,
            priority,
            memsize,
        });
    }
    Ok(jobs)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
