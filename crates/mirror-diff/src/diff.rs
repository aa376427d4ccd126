//! Diff types and computation

use std::time::Duration;

use serde::{Deserialize, Serialize};
use similar::{Algorithm, ChangeTag, TextDiff};

use crate::{Error, Result};

/// Default upper bound on the time spent searching for a minimal diff.
///
/// Past the deadline `similar` falls back to a coarser, still valid,
/// edit script, which keeps huge or binary files from stalling a sync.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Kind of an entry in a full edit script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditKind {
    Equal,
    Insert,
    Delete,
}

/// Kind of a recorded span; equal spans are never recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    Insert,
    Delete,
}

/// One run of same-kind changes in the full edit script.
///
/// Offsets count characters, not bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub kind: EditKind,
    pub text: String,
    /// Position in the old text where this run starts
    pub old_offset: usize,
    /// Position in the new text where this run starts
    pub new_offset: usize,
}

/// A recorded insertion or deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSpan {
    #[serde(rename = "type")]
    pub kind: SpanKind,
    pub text: String,
    /// Character offset into the old text
    pub offset: usize,
}

impl DiffSpan {
    pub fn insert(text: impl Into<String>, offset: usize) -> Self {
        Self {
            kind: SpanKind::Insert,
            text: text.into(),
            offset,
        }
    }

    pub fn delete(text: impl Into<String>, offset: usize) -> Self {
        Self {
            kind: SpanKind::Delete,
            text: text.into(),
            offset,
        }
    }
}

/// The non-equal part of an edit script, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiffRecord {
    spans: Vec<DiffSpan>,
}

impl DiffRecord {
    pub fn new(spans: Vec<DiffSpan>) -> Self {
        Self { spans }
    }

    /// Drop the equal runs of a full edit script.
    pub fn from_script(script: &[Edit]) -> Self {
        let spans = script
            .iter()
            .filter_map(|edit| {
                let kind = match edit.kind {
                    EditKind::Equal => return None,
                    EditKind::Insert => SpanKind::Insert,
                    EditKind::Delete => SpanKind::Delete,
                };
                Some(DiffSpan {
                    kind,
                    text: edit.text.clone(),
                    offset: edit.old_offset,
                })
            })
            .collect();
        Self { spans }
    }

    pub fn spans(&self) -> &[DiffSpan] {
        &self.spans
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Characters inserted and deleted across all spans.
    pub fn churn(&self) -> (usize, usize) {
        self.spans.iter().fold((0, 0), |(ins, del), span| {
            let n = span.text.chars().count();
            match span.kind {
                SpanKind::Insert => (ins + n, del),
                SpanKind::Delete => (ins, del + n),
            }
        })
    }

    /// Structured form stored by the change log.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Computes character-level diffs with the Myers algorithm.
#[derive(Debug, Clone, Copy)]
pub struct DiffEngine {
    timeout: Option<Duration>,
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

impl DiffEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always search for the minimal diff, however long it takes.
    pub fn unbounded() -> Self {
        Self { timeout: None }
    }

    /// Full edit script from `old` to `new`, equal runs included.
    pub fn edit_script(&self, old: &str, new: &str) -> Vec<Edit> {
        let mut config = TextDiff::configure();
        config.algorithm(Algorithm::Myers);
        if let Some(timeout) = self.timeout {
            config.timeout(timeout);
        }
        let diff = config.diff_chars(old, new);

        let mut edits: Vec<Edit> = Vec::new();
        let (mut old_pos, mut new_pos) = (0usize, 0usize);

        for change in diff.iter_all_changes() {
            let kind = match change.tag() {
                ChangeTag::Equal => EditKind::Equal,
                ChangeTag::Insert => EditKind::Insert,
                ChangeTag::Delete => EditKind::Delete,
            };
            let value = change.value();

            match edits.last_mut() {
                Some(last) if last.kind == kind => last.text.push_str(value),
                _ => edits.push(Edit {
                    kind,
                    text: value.to_string(),
                    old_offset: old_pos,
                    new_offset: new_pos,
                }),
            }

            let len = value.chars().count();
            if kind != EditKind::Insert {
                old_pos += len;
            }
            if kind != EditKind::Delete {
                new_pos += len;
            }
        }

        edits
    }

    /// Insertions and deletions turning `old` into `new`.
    pub fn diff(&self, old: &str, new: &str) -> DiffRecord {
        if old == new {
            return DiffRecord::default();
        }
        DiffRecord::from_script(&self.edit_script(old, new))
    }

    /// Diff raw file contents, decoding invalid UTF-8 lossily.
    pub fn diff_bytes(&self, old: &[u8], new: &[u8]) -> DiffRecord {
        if old == new {
            return DiffRecord::default();
        }
        self.diff(&String::from_utf8_lossy(old), &String::from_utf8_lossy(new))
    }
}

/// Replay `record` on top of `old`, reconstructing the new text.
pub fn apply(old: &str, record: &DiffRecord) -> Result<String> {
    let chars: Vec<char> = old.chars().collect();
    let mut out = String::with_capacity(old.len());
    let mut cursor = 0;

    for span in record.spans() {
        if span.offset < cursor || span.offset > chars.len() {
            return Err(Error::OffsetOutOfRange {
                offset: span.offset,
                len: chars.len(),
            });
        }
        out.extend(&chars[cursor..span.offset]);
        cursor = span.offset;

        match span.kind {
            SpanKind::Insert => out.push_str(&span.text),
            SpanKind::Delete => {
                let end = cursor + span.text.chars().count();
                if end > chars.len() || !chars[cursor..end].iter().copied().eq(span.text.chars()) {
                    return Err(Error::DeleteMismatch {
                        offset: span.offset,
                    });
                }
                cursor = end;
            }
        }
    }

    out.extend(&chars[cursor..]);
    Ok(out)
}
