use crossbeam_channel::Sender;
use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM, SIGTSTP, SIGTTIN, SIGTTOU};
use signal_hook::iterator::Signals;
use socket2::Socket;
use std::fs::File;
use std::io::Result;
use std::net::Shutdown;
use std::sync::{Arc, Mutex};
use std::thread::{spawn, JoinHandle};

/// Signals that terminate the daemon.
const TERM_SIGNALS: [i32; 3] = [SIGHUP, SIGINT, SIGTERM];

/// Terminal job-control signals the daemon must be immune to.
const JOB_CONTROL_SIGNALS: [i32; 3] = [SIGTSTP, SIGTTIN, SIGTTOU];

#[derive(Default)]
struct Inner {
  stopping: bool,
  listener: Option<Socket>,
  client: Option<Socket>,
  printout: Option<File>,
}

/// Handles of the job in progress, shared between the serve loop and the
/// signal bridge. Each slot holds a duplicate descriptor of the handle the
/// serve loop owns; an occupied slot is the open-flag for that handle.
///
/// The slot update and the decision it reflects happen inside one critical
/// section, so the bridge never acts on a handle the serve loop has already
/// closed, and never misses one it has just opened.
pub struct JobHandles {
  inner: Mutex<Inner>,
}

impl JobHandles {
  pub fn new() -> Self {
    Self {
      inner: Mutex::new(Inner::default()),
    }
  }

  /// Register the listening socket. Done once, right after `listen`.
  pub fn set_listener(&self, listener: &Socket) -> Result<()> {
    let dup = listener.try_clone()?;
    self.inner.lock().unwrap().listener = Some(dup);
    Ok(())
  }

  /// Register the accepted client socket.
  /// Refused (returns `false`) once shutdown has begun: the caller must
  /// drop the client and stop serving instead.
  pub fn set_client(&self, client: &Socket) -> Result<bool> {
    let dup = client.try_clone()?;
    let mut inner = self.inner.lock().unwrap();
    if inner.stopping {
      return Ok(false);
    }
    inner.client = Some(dup);
    Ok(true)
  }

  /// The serve loop has stopped and is about to close the listener.
  pub fn clear_listener(&self) {
    self.inner.lock().unwrap().listener = None;
  }

  /// The transfer ended and the serve loop is about to close the client.
  pub fn clear_client(&self) {
    self.inner.lock().unwrap().client = None;
  }

  /// Register the output file of the job in progress.
  pub fn set_printout(&self, printout: &File) -> Result<()> {
    let dup = printout.try_clone()?;
    self.inner.lock().unwrap().printout = Some(dup);
    Ok(())
  }

  /// The printout is complete and the serve loop is about to close it.
  pub fn clear_printout(&self) {
    self.inner.lock().unwrap().printout = None;
  }

  pub fn client_open(&self) -> bool {
    self.inner.lock().unwrap().client.is_some()
  }

  pub fn printout_open(&self) -> bool {
    self.inner.lock().unwrap().printout.is_some()
  }

  pub fn is_stopping(&self) -> bool {
    self.inner.lock().unwrap().stopping
  }

  /// Teardown pass run by the signal bridge: flush filesystem buffers,
  /// unblock the serve loop wherever it is parked, and refuse any further
  /// client registration. Failures are logged, never fatal.
  ///
  /// The serve loop keeps ownership of every handle and runs its usual
  /// close sequence once unblocked, so each descriptor is closed exactly
  /// once.
  pub fn begin_shutdown(&self) {
    let mut inner = self.inner.lock().unwrap();
    inner.stopping = true;
    nix::unistd::sync();

    if let Some(client) = &inner.client {
      if let Err(e) = client.shutdown(Shutdown::Both) {
        log::warn!("shutdown path: error closing client socket: {e}");
      }
    }
    if let Some(printout) = &inner.printout {
      if let Err(e) = printout.sync_all() {
        log::warn!("shutdown path: error flushing printout: {e}");
      }
    }
    if let Some(listener) = &inner.listener {
      if let Err(e) = listener.shutdown(Shutdown::Both) {
        log::warn!("shutdown path: error closing listening socket: {e}");
      }
    }
  }
}

impl Default for JobHandles {
  fn default() -> Self {
    Self::new()
  }
}

/// Bridge thread turning OS signals into an orderly daemon shutdown.
///
/// Termination signals run [`JobHandles::begin_shutdown`] and then fire the
/// shutdown channel the serve loop polls. Job-control signals are swallowed
/// so stopping or backgrounding the controlling terminal never touches the
/// daemon.
pub struct SignalBridge {
  worker: JoinHandle<()>,
}

impl SignalBridge {
  /// Install the signal handlers and start the bridge thread.
  /// Must run before the listening socket is created.
  pub fn install(handles: Arc<JobHandles>, stop_tx: Sender<()>) -> Result<Self> {
    let signals = Signals::new(TERM_SIGNALS.iter().chain(JOB_CONTROL_SIGNALS.iter()))?;
    let worker = spawn(move || Self::work(signals, handles, stop_tx));
    Ok(Self { worker })
  }

  /// Wait for the bridge to finish its teardown pass. Only meaningful after
  /// the shutdown channel has fired; the bridge is parked on the signal
  /// iterator until then.
  pub fn join(self) {
    let _ = self.worker.join();
  }

  fn work(mut signals: Signals, handles: Arc<JobHandles>, stop_tx: Sender<()>) {
    for signum in signals.forever() {
      if JOB_CONTROL_SIGNALS.contains(&signum) {
        log::debug!("ignoring job control signal {signum}");
        continue;
      }
      log::info!("received signal {signum}, will close all open handles and exit");
      handles.begin_shutdown();
      // the serve loop may already be gone when the channel fires late
      let _ = stop_tx.send(());
      return;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use socket2::{Domain, Type};

  fn sock() -> Socket {
    Socket::new(Domain::IPV4, Type::STREAM, None).unwrap()
  }

  #[test]
  fn slots_track_open_handles() {
    let handles = JobHandles::new();
    assert!(!handles.client_open());
    assert!(!handles.printout_open());

    let client = sock();
    assert!(handles.set_client(&client).unwrap());
    assert!(handles.client_open());

    let dir = tempfile::tempdir().unwrap();
    let printout = File::create(dir.path().join("page")).unwrap();
    handles.set_printout(&printout).unwrap();
    assert!(handles.printout_open());

    handles.clear_printout();
    handles.clear_client();
    assert!(!handles.client_open());
    assert!(!handles.printout_open());
  }

  #[test]
  fn registration_refused_after_shutdown_begins() {
    let handles = JobHandles::new();
    handles.begin_shutdown();
    assert!(handles.is_stopping());
    assert!(!handles.set_client(&sock()).unwrap());
    assert!(!handles.client_open());
  }

  #[test]
  fn teardown_errors_are_not_fatal() {
    let handles = JobHandles::new();
    // unconnected sockets make every shutdown call fail
    let listener = sock();
    let client = sock();
    handles.set_listener(&listener).unwrap();
    assert!(handles.set_client(&client).unwrap());
    handles.begin_shutdown();
    assert!(handles.is_stopping());
  }
}
