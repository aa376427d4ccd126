//! Filesystem primitives for dirmirror
//!
//! Provides normalized path handling, recursive tree scanning, retrying
//! I/O operations used to keep a backup mirror in step with its source,
//! and format-agnostic configuration loading.

pub mod checksum;
pub mod config;
pub mod error;
pub mod io;
pub mod path;
pub mod scan;

pub use checksum::{MirrorMismatch, verify_mirror};
pub use config::ConfigStore;
pub use error::{Error, Result};
pub use io::RobustnessConfig;
pub use path::NormalizedPath;
pub use scan::{ScanEntry, directories, scan};
