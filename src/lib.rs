/// Compile-time endpoint, spool and transfer defaults.
mod default_config;
pub use default_config::DefaultConfig;

/// Printout file naming and creation.
mod printout;
pub use printout::create_printout;

/// Shared job-handle state and the signal-driven shutdown bridge.
mod shutdown;
pub use shutdown::{JobHandles, SignalBridge};

/// TCP accept-serve loop writing one printout per connection.
mod server;
pub use server::PrintServer;

/// Double-fork daemonization.
mod daemon;
pub use daemon::daemonize;
