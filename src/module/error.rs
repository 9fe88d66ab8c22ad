//! Error taxonomy of the pipeline.
//!
//! Device failures and closed queues end the stage that hits them. Everything
//! else is local to one artifact or one candidate: it is logged and the stage
//! moves on.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NightwatchError {
    /// The capture device is unavailable or returned malformed data.
    #[error("camera device error: {0}")]
    Device(String),

    /// A clip or an evidence crop could not be written.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Image decoding or encoding failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// A still or candidate could not be analysed (e.g. zero-area crop, vision library failure).
    #[error("detector error: {0}")]
    Detector(String),

    /// A detector model is missing or malformed.
    #[error("model error: {0}")]
    Model(String),

    /// Configuration could not be read, written or validated.
    #[error("config error: {0}")]
    Config(String),

    /// The consumer side of a queue is gone.
    #[error("queue closed: {0}")]
    QueueClosed(&'static str),

    /// A stage thread could not be started.
    #[error("can't start {stage} thread: {source}")]
    Thread {
        stage: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl NightwatchError {
    /// Whether the error must stop the stage that raised it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Device(_) | Self::QueueClosed(_) | Self::Thread { .. }
        )
    }

    /// Wrap an io error together with the path it happened on.
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, NightwatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatality_test() {
        assert!(NightwatchError::Device("gone".into()).is_fatal());
        assert!(NightwatchError::QueueClosed("stills").is_fatal());
        assert!(!NightwatchError::Detector("empty crop".into()).is_fatal());
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = NightwatchError::storage("/tmp/x.h264", io);
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("/tmp/x.h264"));
    }
}
