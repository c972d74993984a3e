//! Transport-layer error types.

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid or missing target callsign")]
    InvalidTarget,

    #[error("digipeater path is not supported by the {0} scheme")]
    DigisUnsupported(String),

    #[error("no dialer has been registered for the {0} scheme")]
    MissingDialer(String),

    #[error("malformed transport URL: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
