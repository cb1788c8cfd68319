use nix::sys::stat::{umask, Mode};
use nix::unistd::{chdir, dup2, fork, setsid, ForkResult};
use std::fs::File;
use std::io::Result;
use std::os::unix::io::AsRawFd;
use std::process;

/// Detach the process from the invoking shell session: double fork with a
/// new session in between, working directory moved to the filesystem root,
/// file-creation mask cleared, standard descriptors pointed at /dev/null.
///
/// Must run before any thread is spawned, only the forking thread survives
/// in the child.
pub fn daemonize() -> Result<()> {
  if let ForkResult::Parent { .. } = unsafe { fork() }? {
    process::exit(0);
  }
  setsid()?;
  if let ForkResult::Parent { .. } = unsafe { fork() }? {
    process::exit(0);
  }

  if let Err(e) = chdir("/") {
    log::warn!("error changing working directory to /: {e}");
  }
  umask(Mode::empty());

  let null = File::options().read(true).write(true).open("/dev/null")?;
  for stdio in 0..=2 {
    dup2(null.as_raw_fd(), stdio)?;
  }
  Ok(())
}
