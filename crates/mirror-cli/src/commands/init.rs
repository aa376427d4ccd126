//! `init-only`: build the mirror and exit

use std::path::Path;

use colored::Colorize;
use mirror_core::{MirrorRoots, init_mirror};
use mirror_fs::{MirrorMismatch, RobustnessConfig, verify_mirror};

use super::load_setting;
use crate::error::{CliError, Result};

pub fn run_init_only(config: &Path, backup: Option<&Path>, verify: bool) -> Result<()> {
    let setting = load_setting(config, backup)?;
    let roots = MirrorRoots::resolve(&setting.path, &setting.backup)?;
    let summary = init_mirror(&roots, RobustnessConfig::default())?;

    println!(
        "{} {} -> {} ({} directories, {} files, {} bytes)",
        "Mirrored".green().bold(),
        roots.source,
        roots.backup,
        summary.directories,
        summary.files,
        summary.bytes
    );

    if !verify {
        return Ok(());
    }

    let mismatches = verify_mirror(roots.source.to_native(), roots.backup.to_native())?;
    if mismatches.is_empty() {
        println!("{} mirror matches source", "Verified".green().bold());
        return Ok(());
    }

    for mismatch in &mismatches {
        let label = match mismatch {
            MirrorMismatch::Missing(_) => "missing",
            MirrorMismatch::Extra(_) => "extra",
            MirrorMismatch::KindDiffers(_) => "kind differs",
            MirrorMismatch::ContentDiffers(_) => "content differs",
        };
        println!("  {} {}", label.yellow(), mismatch.relative_path());
    }
    Err(CliError::user(format!(
        "mirror differs from source in {} path(s)",
        mismatches.len()
    )))
}
