//! Session error taxonomy.
//!
//! Everything discovered after the handshake aborts the session; only
//! oversized offsets and unsupported proposal codes are recovered locally
//! (by clamping and deferring, respectively) and so never appear here.

use hamlink_core::{MessageError, ProposalError};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The remote's SID does not advertise the `B2F` capability.
    #[error("remote does not support the B2 forwarding protocol")]
    NoB2Support,

    /// An unexpected line, prefix or byte on the wire.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The `F>` checksum of a proposal block did not add up.
    #[error("proposal block checksum mismatch: computed {computed:02X}, received {received:02X}")]
    BlockChecksum { computed: u8, received: u8 },

    /// The additive checksum trailing a compressed body did not add up.
    #[error("bad message body checksum")]
    BodyChecksum,

    /// The remote terminated with a `***` error line; the payload is the
    /// rest of that line.
    #[error("remote error: {0}")]
    Remote(String),

    /// The byte following a turnover was neither `F` nor `;`.
    #[error("unexpected response: {0:?}")]
    UnexpectedResponse(String),

    /// `FQ` arrived while proposals were still outstanding.
    #[error("got quit command while proposals were pending")]
    QuitWhilePending,

    /// An outbound message body too short to be a valid LZHUF stream.
    #[error("invalid compressed message body")]
    InvalidBody,

    /// A malformed proposal or answer line.
    #[error(transparent)]
    Proposal(#[from] ProposalError),

    /// A received message that does not parse.
    #[error(transparent)]
    Message(#[from] MessageError),

    /// The mailbox handler refused a received message.
    #[error("mailbox handler: {0}")]
    Handler(crate::handler::HandlerError),

    /// An I/O error on the underlying transport, surfaced unchanged.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
