use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};

/// Refuse a migration plan that would write over one of its own inputs.
///
/// Only `--in-place` may do that, and it never calls this guard.
pub fn ensure_not_overwriting(outputs: &[(&Path, &Path)]) -> Result<()> {
    for (input, output) in outputs {
        let input_abs = absolute(input)?;
        let output_abs = absolute(output)?;
        if input_abs == output_abs {
            bail!(
                "refusing to overwrite source file {} (use --in-place to rewrite inputs)",
                input.display()
            );
        }
    }
    Ok(())
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return path
            .canonicalize()
            .with_context(|| format!("canonicalize {}", path.display()));
    }

    let base = if path.is_absolute() {
        PathBuf::new()
    } else {
        std::env::current_dir().context("current_dir")?
    };
    Ok(lexical_normalize(&base.join(path)))
}

/// Resolve `.` and `..` without touching the filesystem.
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
