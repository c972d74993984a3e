//! Message, address and proposal model for the Winlink/FBB B2F protocol.
//!
//! This crate holds everything the session engine exchanges but that is not
//! itself wire I/O: the RFC-5322-derived message format with its radio
//! extensions (`Mid`, `Type`, `Mbo`, `File:` attachments), callsign/SMTP
//! address canonicalization, word-encoding of non-ASCII header values, and
//! the proposal metadata that precedes every transferred message.

mod address;
mod date;
mod error;
mod message;
mod mid;
mod proposal;
mod wordenc;

pub use address::{parse_fw, Address};
pub use date::{format_date, parse_date};
pub use error::{MessageError, ProposalError};
pub use message::{File, Header, Message, MessageType};
pub use mid::generate_mid;
pub use proposal::{
    answer_line, block_checksum, parse_answer_line, parse_proposal_line, sort_proposals,
    PropCode, Proposal, ProposalAnswer, MAX_BLOCK_SIZE, PROTOCOL_OFFSET_LIMIT,
};
pub use wordenc::{decode_header, decode_text, encode_header};
