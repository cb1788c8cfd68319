use chrono::{Local, TimeZone};
use rand::Rng;
use std::fs::{File, OpenOptions};
use std::io::{Error, ErrorKind, Result};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::DefaultConfig;

/// strftime-style pattern for timestamp printout names
const TIMESTAMP_FORMAT: &str = "%d.%m.%Y-%H:%M:%S";

/// Printouts are readable and writable by the daemon owner only.
const PRINTOUT_MODE: u32 = 0o600;

/// Name the printout after the current wall-clock time.
/// `None` when the clock cannot be read or converted to a calendar date.
fn timestamp_name() -> Option<String> {
  let clock = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
  let stamp = Local.timestamp_opt(clock.as_secs() as i64, 0).single()?;
  Some(stamp.format(TIMESTAMP_FORMAT).to_string())
}

/// Probe randomized `file-<n>` names under `spool_dir` until one does not
/// exist on disk, giving up after `attempts` probes.
fn random_name(spool_dir: &Path, attempts: usize) -> Result<PathBuf> {
  let mut rng = rand::thread_rng();
  for _ in 0..attempts {
    let candidate = spool_dir.join(format!("file-{}", rng.gen::<u32>()));
    if !candidate.exists() {
      return Ok(candidate);
    }
  }
  Err(Error::new(
    ErrorKind::AlreadyExists,
    "no unused randomized printout name",
  ))
}

/// Pick a path for the next printout: wall-clock timestamp, or a probed
/// randomized name when the clock read fails.
fn select_path(spool_dir: &Path) -> Result<PathBuf> {
  match timestamp_name() {
    Some(name) => Ok(spool_dir.join(name)),
    None => {
      log::warn!("error getting current time");
      random_name(spool_dir, DefaultConfig::RANDOM_NAME_ATTEMPTS)
    }
  }
}

/// Create the output file for one print job: write-only, create-if-missing,
/// owner read/write permission only.
pub fn create_printout(spool_dir: &Path) -> Result<(File, PathBuf)> {
  let path = select_path(spool_dir)?;
  let file = OpenOptions::new()
    .write(true)
    .create(true)
    .mode(PRINTOUT_MODE)
    .open(&path)?;
  Ok((file, path))
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::NaiveDateTime;
  use std::os::unix::fs::PermissionsExt;

  #[test]
  fn timestamp_name_is_calendar_shaped() {
    let name = timestamp_name().unwrap();
    NaiveDateTime::parse_from_str(&name, TIMESTAMP_FORMAT).unwrap();
  }

  #[test]
  fn random_name_probes_existing_files() {
    let dir = tempfile::tempdir().unwrap();
    let first = random_name(dir.path(), 8).unwrap();
    assert!(!first.exists());
    assert!(first.file_name().unwrap().to_str().unwrap().starts_with("file-"));

    // a taken name must never be returned again
    File::create(&first).unwrap();
    for _ in 0..16 {
      let next = random_name(dir.path(), 8).unwrap();
      assert_ne!(next, first);
    }
  }

  #[test]
  fn random_name_budget_exhaustion_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(random_name(dir.path(), 0).is_err());
  }

  #[test]
  fn printout_is_owner_read_write_only() {
    let dir = tempfile::tempdir().unwrap();
    let (file, path) = create_printout(dir.path()).unwrap();
    let mode = file.metadata().unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    assert!(path.starts_with(dir.path()));
  }

  #[test]
  fn missing_spool_dir_fails_without_creating() {
    let dir = tempfile::tempdir().unwrap();
    let gone = dir.path().join("not-there");
    assert!(create_printout(&gone).is_err());
    assert!(!gone.exists());
  }
}
