use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for cache operations
///
/// A cache miss is never an error; it is reported as `Ok(None)`.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Invalid capacity: {0} (must be greater than zero)")]
    InvalidCapacity(usize),

    #[error("Cache directory is not configured")]
    MissingDirectory,

    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupted cache record {path:?}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Purge failed: {failures} errors, last error is {last}")]
    Purge {
        failures: usize,
        #[source]
        last: Box<CacheError>,
    },

    #[error("Tier {tier}: {source}")]
    Tier {
        tier: usize,
        #[source]
        source: Box<CacheError>,
    },

    #[error("{}", JoinedDisplay(.0))]
    Multiple(Vec<CacheError>),

    #[error("Loader failed: {0}")]
    Loader(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Collapse a list of errors into a single result.
    ///
    /// No errors yields `Ok(())`, a single error is returned as-is and
    /// anything more is wrapped in [`CacheError::Multiple`].
    pub fn join(mut errors: Vec<CacheError>) -> Result<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Self::Multiple(errors)),
        }
    }

    /// Number of leaf errors carried by this value
    pub fn count(&self) -> usize {
        match self {
            Self::Multiple(errors) => errors.iter().map(CacheError::count).sum(),
            _ => 1,
        }
    }

    /// Tier index for errors raised by a chain tier
    pub fn tier(&self) -> Option<usize> {
        match self {
            Self::Tier { tier, .. } => Some(*tier),
            _ => None,
        }
    }
}

struct JoinedDisplay<'a>(&'a [CacheError]);

impl fmt::Display for JoinedDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, err) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::Serialization(e.to_string())
    }
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
