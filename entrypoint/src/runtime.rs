//! Process-wide switches taken from the command line.

use std::sync::atomic::{AtomicBool, Ordering};

static DRY_RUN: AtomicBool = AtomicBool::new(false);

/// Records `--dry-run`; the program name in `args[0]` is ignored.
pub fn configure_from_args(args: &[String]) -> bool {
  let enabled = has_flag(args, "--dry-run");
  DRY_RUN.store(enabled, Ordering::SeqCst);
  enabled
}

/// In dry-run mode nothing is created, spawned or exec'd; each stage
/// prints what it would have done.
pub fn is_dry_run() -> bool {
  DRY_RUN.load(Ordering::SeqCst)
}

fn has_flag(args: &[String], flag: &str) -> bool {
  args.iter().skip(1).any(|a| a == flag)
}
