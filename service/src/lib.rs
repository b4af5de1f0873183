//! Infrastructure shared by the gateway binary and the `web` crate:
//! configuration loading and terminal logging.

pub mod config;
pub mod logging;
