//! Host operating system detection.

use thiserror::Error;

pub use crate::os::HostOs;

mod os;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown operating system: {0}")]
    UnknownOs(String),
}
