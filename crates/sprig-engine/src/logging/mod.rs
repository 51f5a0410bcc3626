//! Logger bootstrap.
//!
//! Library code only talks to the `log` facade; binaries call
//! [`init_logging`] once to route it through `env_logger`.

mod init;

pub use init::{init_logging, LoggingConfig};
