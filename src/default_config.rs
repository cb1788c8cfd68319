use std::net::{Ipv4Addr, SocketAddrV4};

/// Built-in daemon configuration.
/// The daemon takes no arguments; every knob is a compile-time constant.
pub struct DefaultConfig;

impl DefaultConfig {
  /// Loopback address the daemon listens on.
  pub const LISTEN_ADDR: Ipv4Addr = Ipv4Addr::LOCALHOST;
  /// TCP port the printing subsystem is pointed at.
  pub const LISTEN_PORT: u16 = 12345;
  /// Number of not-yet-accepted connections the listener will queue.
  pub const BACKLOG: i32 = 4;
  /// Transfer chunk size in bytes.
  pub const CHUNK_SIZE: usize = 512;
  /// Directory where printouts are spooled.
  pub const SPOOL_DIR: &'static str = "/var/spool/tcp_fileprinter";
  /// Attempt budget for probing a free randomized printout name.
  pub const RANDOM_NAME_ATTEMPTS: usize = 64;

  pub fn listen_endpoint() -> SocketAddrV4 {
    SocketAddrV4::new(Self::LISTEN_ADDR, Self::LISTEN_PORT)
  }
}
