//! Errors that abort a whole generation run.
//!
//! Problems with single records never end up here, they are reported as
//! [`RejectReason`](crate::normalizer::RejectReason)s instead.

use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The assembled document failed its own consistency check.
    #[error("calendar serialization failed: {0}")]
    Serialization(String),

    /// The feed could not be written to its output path.
    #[error("failed to write calendar to {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
