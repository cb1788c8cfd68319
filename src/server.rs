use crossbeam_channel::Receiver;
use socket2::{Domain, Socket, Type};
use std::io::{ErrorKind, Read, Result, Write};
use std::net::{SocketAddr, SocketAddrV4};
use std::path::PathBuf;
use std::sync::Arc;

use crate::{create_printout, DefaultConfig, JobHandles};

/// The accept-serve loop: one client at a time, each client's byte stream
/// written verbatim to a fresh printout file.
pub struct PrintServer {
  listener: Socket,
  spool_dir: PathBuf,
  handles: Arc<JobHandles>,
}

impl PrintServer {
  /// Bind and listen on `endpoint`, registering the listener with the
  /// shared handle state. Errors here are unrecoverable startup errors.
  pub fn bind(endpoint: SocketAddrV4, spool_dir: PathBuf, handles: Arc<JobHandles>) -> Result<Self> {
    let listener = Socket::new(Domain::IPV4, Type::STREAM, None)?;
    listener.set_reuse_address(true)?;
    listener.bind(&endpoint.into())?;
    listener.listen(DefaultConfig::BACKLOG)?;
    handles.set_listener(&listener)?;
    Ok(Self {
      listener,
      spool_dir,
      handles,
    })
  }

  /// The endpoint actually bound, for callers that bind port 0.
  pub fn local_endpoint(&self) -> Result<SocketAddr> {
    let addr = self.listener.local_addr()?;
    addr.as_socket().ok_or_else(|| ErrorKind::AddrNotAvailable.into())
  }

  /// Serve print clients one after another until the shutdown channel
  /// fires. Accept failures are logged and retried; a failed printout open
  /// abandons that client only.
  pub fn serve(&self, shutdown: Receiver<()>) {
    while shutdown.try_recv().is_err() {
      let client = match self.listener.accept() {
        Ok((client, _peer)) => client,
        Err(e) => {
          // an accept error is expected once the bridge shut the listener down
          if self.handles.is_stopping() {
            continue;
          }
          log::warn!("error accepting print client: {e}");
          continue;
        }
      };
      log::info!("accepted new print client");
      match self.handles.set_client(&client) {
        Ok(true) => {}
        // shutdown began while accept was parked, the job is never started
        Ok(false) => break,
        Err(e) => {
          log::warn!("error registering print client: {e}");
          continue;
        }
      }
      self.serve_client(client);
    }
    self.handles.clear_listener();
  }

  /// Run one print job to completion, then release both handles.
  fn serve_client(&self, mut client: Socket) {
    let (mut printout, path) = match create_printout(&self.spool_dir) {
      Ok(created) => created,
      Err(e) => {
        log::warn!("error opening printout under {}: {e}", self.spool_dir.display());
        self.handles.clear_client();
        return;
      }
    };
    if let Err(e) = self.handles.set_printout(&printout) {
      log::warn!("error registering printout {}: {e}", path.display());
      self.handles.clear_client();
      return;
    }

    log::info!("start printing to {}", path.display());
    let written = copy_job(&mut client, &mut printout);
    log::info!("done printing {written} bytes to {}", path.display());

    self.handles.clear_printout();
    drop(printout);
    self.handles.clear_client();
  }
}

/// Copy one print job in fixed-size chunks until the client stops sending.
/// A read error ends the job exactly like a clean close; a write error ends
/// it with a warning. Returns the number of bytes written.
fn copy_job<R: Read, W: Write>(client: &mut R, printout: &mut W) -> u64 {
  let mut buf = [0u8; DefaultConfig::CHUNK_SIZE];
  let mut written = 0u64;
  loop {
    let n = match client.read(&mut buf) {
      Ok(0) | Err(_) => break,
      Ok(n) => n,
    };
    if let Err(e) = printout.write_all(&buf[..n]) {
      log::warn!("error writing printout: {e}");
      break;
    }
    written += n as u64;
  }
  // scrub the job's bytes out of the transfer buffer
  buf.fill(0);
  written
}
