use crossbeam_channel::unbounded;
use signal_hook::consts::signal::{SIGHUP, SIGTSTP};
use signal_hook::low_level::raise;
use std::sync::Arc;
use std::time::Duration;

use tcp_fileprinter::{JobHandles, SignalBridge};

// Signals are process-global: everything stays in one test function so two
// raises can never interleave.
#[test]
fn job_control_is_ignored_and_termination_honored() {
  let handles = Arc::new(JobHandles::new());
  let (stop_tx, stop_rx) = unbounded();
  let bridge = SignalBridge::install(handles.clone(), stop_tx).unwrap();

  // stopping the "terminal" must not touch the daemon
  raise(SIGTSTP).unwrap();
  assert!(stop_rx.recv_timeout(Duration::from_millis(300)).is_err());
  assert!(!handles.is_stopping());

  raise(SIGHUP).unwrap();
  stop_rx
    .recv_timeout(Duration::from_secs(5))
    .expect("termination signal did not reach the serve loop");
  assert!(handles.is_stopping());
  bridge.join();
}
