//! Raw notifications and their classification into change events
//!
//! A notification carries a path and a bitmask of raw operations. The
//! [`Classifier`] turns it into zero or more [`ChangeEvent`]s, one per
//! matching bit, and names every notification it refuses with a
//! [`SkipReason`] so drops stay observable.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::path::PathBuf;

use mirror_fs::{NormalizedPath, io};
use serde::{Deserialize, Serialize};

/// Bitmask of raw operations reported for one path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RawOp(u8);

impl RawOp {
    pub const WRITE: Self = Self(1);
    pub const CREATE: Self = Self(1 << 1);
    pub const REMOVE: Self = Self(1 << 2);
    pub const RENAME: Self = Self(1 << 3);
    pub const CHMOD: Self = Self(1 << 4);

    const NAMES: [(Self, &'static str); 5] = [
        (Self::WRITE, "WRITE"),
        (Self::CREATE, "CREATE"),
        (Self::REMOVE, "REMOVE"),
        (Self::RENAME, "RENAME"),
        (Self::CHMOD, "CHMOD"),
    ];

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn contains(self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for RawOp {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for RawOp {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for RawOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            write!(f, "NONE")
        } else {
            write!(f, "{}", names.join("|"))
        }
    }
}

/// A notification as delivered by the event source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawNotification {
    pub path: PathBuf,
    pub op: RawOp,
}

impl RawNotification {
    pub fn new(path: impl Into<PathBuf>, op: RawOp) -> Self {
        Self {
            path: path.into(),
            op,
        }
    }
}

/// Semantic operation applied to the mirror
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    Create,
    Modify,
    Remove,
    RenameAway,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Modify => write!(f, "modify"),
            Self::Remove => write!(f, "remove"),
            Self::RenameAway => write!(f, "rename-away"),
        }
    }
}

/// A classified change, ready for the mirror
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Path in the source tree, temp markers stripped
    pub target: NormalizedPath,
    /// Corresponding path in the backup mirror
    pub backup: NormalizedPath,
    pub op: Operation,
}

/// Why a notification produced no change event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// Create for a path the mirror already has
    DuplicateCreate,
    /// Remove for a path that exists again in the source
    StaleRemove,
    /// Path does not lie under the source root
    OutsideRoot,
    /// Only attributes changed
    AttributeOnly,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateCreate => write!(f, "duplicate-create"),
            Self::StaleRemove => write!(f, "stale-remove"),
            Self::OutsideRoot => write!(f, "outside-root"),
            Self::AttributeOnly => write!(f, "attribute-only"),
        }
    }
}

/// Outcome of classifying one bit of a notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    Accepted(ChangeEvent),
    Skipped {
        path: NormalizedPath,
        reason: SkipReason,
    },
}

/// Maps raw notifications onto change events for one source/backup pair
#[derive(Debug, Clone)]
pub struct Classifier {
    source_root: NormalizedPath,
    backup_root: NormalizedPath,
    markers: Vec<char>,
}

impl Classifier {
    pub fn new(source_root: NormalizedPath, backup_root: NormalizedPath, markers: Vec<char>) -> Self {
        Self {
            source_root,
            backup_root,
            markers,
        }
    }

    pub fn source_root(&self) -> &NormalizedPath {
        &self.source_root
    }

    pub fn backup_root(&self) -> &NormalizedPath {
        &self.backup_root
    }

    /// Classify each set bit independently, in WRITE, CREATE, REMOVE,
    /// RENAME order.
    ///
    /// The create and remove guards look at the filesystem at call time:
    /// a create whose mirror path already exists and a remove whose source
    /// path is back are both refused.
    pub fn classify(&self, raw: &RawNotification) -> Vec<Classified> {
        let target = NormalizedPath::new(&raw.path).strip_markers(&self.markers);
        let Some(backup) = target.rebase(&self.source_root, &self.backup_root) else {
            return vec![Classified::Skipped {
                path: target,
                reason: SkipReason::OutsideRoot,
            }];
        };

        let accept = |op| {
            Classified::Accepted(ChangeEvent {
                target: target.clone(),
                backup: backup.clone(),
                op,
            })
        };
        let skip = |reason| Classified::Skipped {
            path: target.clone(),
            reason,
        };

        let mut out = Vec::new();
        if raw.op.contains(RawOp::WRITE) {
            out.push(accept(Operation::Modify));
        }
        if raw.op.contains(RawOp::CREATE) {
            if io::path_exists(&backup) {
                out.push(skip(SkipReason::DuplicateCreate));
            } else {
                out.push(accept(Operation::Create));
            }
        }
        if raw.op.contains(RawOp::REMOVE) {
            if io::path_exists(&target) {
                out.push(skip(SkipReason::StaleRemove));
            } else {
                out.push(accept(Operation::Remove));
            }
        }
        if raw.op.contains(RawOp::RENAME) {
            out.push(accept(Operation::RenameAway));
        }
        if out.is_empty() && raw.op.contains(RawOp::CHMOD) {
            out.push(skip(SkipReason::AttributeOnly));
        }
        out
    }
}
