//! Error types for the message and proposal model.

use core::fmt;

#[derive(Debug)]
pub enum MessageError {
    /// The message has no `Mid` header.
    MissingMid,
    /// The MID is empty, longer than 12 characters or not ASCII.
    InvalidMid(String),
    /// The message has neither `To` nor `Cc` recipients.
    NoRecipients,
    /// The `Body` header is missing or does not parse as a length.
    InvalidBodyHeader,
    /// A header line without a `: ` separator.
    HeaderSyntax(String),
    /// The data ended before the declared body or attachment length.
    Truncated { expected: usize, actual: usize },
    /// A `File:` header without a size/name pair.
    InvalidFileHeader(String),
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageError::MissingMid => write!(f, "message has no Mid header"),
            MessageError::InvalidMid(mid) => write!(f, "invalid MID: {mid:?}"),
            MessageError::NoRecipients => write!(f, "message has no recipients"),
            MessageError::InvalidBodyHeader => write!(f, "missing or malformed Body header"),
            MessageError::HeaderSyntax(line) => write!(f, "malformed header line: {line:?}"),
            MessageError::Truncated { expected, actual } => {
                write!(f, "message truncated: need {expected} bytes, got {actual}")
            }
            MessageError::InvalidFileHeader(value) => {
                write!(f, "malformed File header: {value:?}")
            }
        }
    }
}

impl std::error::Error for MessageError {}

#[derive(Debug)]
pub enum ProposalError {
    /// A proposal line that does not match `F<code> <type> <mid> <n> <n> <n>`.
    Syntax(String),
    /// A proposal code other than the known ones.
    UnknownCode(char),
    /// An `FS` line with more answers than outstanding proposals.
    TooManyAnswers,
    /// An `A`/`!` answer without the decimal offset that must follow it.
    MissingOffset,
    /// A character in an `FS` line that is not a valid answer.
    InvalidAnswer(char),
    /// The message could not be turned into a proposal.
    Message(MessageError),
    /// Compression of the message body failed.
    Compression(std::io::Error),
}

impl fmt::Display for ProposalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProposalError::Syntax(line) => write!(f, "malformed proposal: {line:?}"),
            ProposalError::UnknownCode(c) => write!(f, "unknown proposal code: {c}"),
            ProposalError::TooManyAnswers => {
                write!(f, "got answer for more proposals than expected")
            }
            ProposalError::MissingOffset => {
                write!(f, "got offset request without offset index")
            }
            ProposalError::InvalidAnswer(c) => {
                write!(f, "invalid character ({c}) in proposal answer line")
            }
            ProposalError::Message(e) => write!(f, "invalid message: {e}"),
            ProposalError::Compression(e) => write!(f, "compressing message: {e}"),
        }
    }
}

impl std::error::Error for ProposalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProposalError::Message(e) => Some(e),
            ProposalError::Compression(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MessageError> for ProposalError {
    fn from(e: MessageError) -> Self {
        ProposalError::Message(e)
    }
}
