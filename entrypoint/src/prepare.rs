use crate::paths;
use crate::runtime;
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};

/// Creates the working directory set under `root`, including missing
/// ancestors. Directories that already exist are left untouched.
pub fn prepare_working_dirs(root: &Path) -> anyhow::Result<Vec<PathBuf>> {
  let dirs = paths::working_dirs(root);

  if runtime::is_dry_run() {
    for dir in &dirs {
      println!("DRY-RUN: would ensure directory {}", dir.display());
    }
    return Ok(dirs.to_vec());
  }

  for dir in &dirs {
    fs::create_dir_all(dir)
      .with_context(|| format!("create working directory {}", dir.display()))?;
  }

  Ok(dirs.to_vec())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn creates_all_three_directories_with_ancestors() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("nested").join("app");

    let created = prepare_working_dirs(&root).unwrap();

    assert_eq!(created.len(), 3);
    assert!(root.join("downloads").is_dir());
    assert!(root.join("logs").is_dir());
    assert!(root.join("celerybeat").is_dir());
  }

  #[test]
  fn second_run_is_a_no_op() {
    let tmp = tempfile::tempdir().unwrap();
    let marker = tmp.path().join("logs").join("keep.log");

    let first = prepare_working_dirs(tmp.path()).unwrap();
    fs::write(&marker, "existing").unwrap();
    let second = prepare_working_dirs(tmp.path()).unwrap();

    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&marker).unwrap(), "existing");
  }

  #[test]
  fn fails_when_a_path_is_occupied_by_a_file() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("logs"), "not a directory").unwrap();

    let err = prepare_working_dirs(tmp.path()).unwrap_err();
    assert!(err.to_string().contains("logs"));
  }
}
