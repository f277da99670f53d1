use thiserror::Error;

/// Why a single probe attempt produced no latency.
///
/// Loops and comparator jobs count these as losses and carry on; they are
/// never returned to the caller of a run.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe timed out after {0} ms")]
    Timeout(u64),

    #[error("host unreachable (exit status {0:?})")]
    Unreachable(Option<i32>),

    #[error("ping succeeded but no latency could be parsed")]
    Unparseable,

    #[error("failed to start ping: {0}")]
    Spawn(#[from] std::io::Error),
}

impl ProbeError {
    /// Short label used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeError::Timeout(_) => "timeout",
            ProbeError::Unreachable(_) => "unreachable",
            ProbeError::Unparseable => "unparseable",
            ProbeError::Spawn(_) => "spawn",
        }
    }
}

/// Errors surfaced to the caller before any probing starts.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("invalid target: {0:?}")]
    InvalidTarget(String),

    #[error("config file error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
