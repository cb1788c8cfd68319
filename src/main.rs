use crossbeam_channel::unbounded;
use std::io::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::{env, process};

use tcp_fileprinter::{daemonize, DefaultConfig, JobHandles, PrintServer, SignalBridge};

fn main() {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

  if env::args().len() > 1 {
    println!("tcp_fileprinter does not take any arguments");
  }

  if let Err(e) = run() {
    log::error!("error starting tcp_fileprinter: {e}");
    process::exit(1);
  }
}

fn run() -> Result<()> {
  daemonize()?;

  // the bridge thread must be spawned after the forks and installed before
  // the listening socket exists
  let handles = Arc::new(JobHandles::new());
  let (stop_tx, stop_rx) = unbounded();
  let bridge = SignalBridge::install(handles.clone(), stop_tx)?;

  let server = PrintServer::bind(
    DefaultConfig::listen_endpoint(),
    PathBuf::from(DefaultConfig::SPOOL_DIR),
    handles,
  )?;
  log::info!(
    "successfully started tcp_fileprinter on {}",
    DefaultConfig::listen_endpoint()
  );

  server.serve(stop_rx);
  bridge.join();
  log::info!("tcp_fileprinter exiting");
  Ok(())
}
