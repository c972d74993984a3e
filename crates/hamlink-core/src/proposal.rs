//! Message proposals: the `F?` lines that offer a message to the remote, the
//! answers to them, and the precedence order in which they are offered.

use tracing::warn;

use crate::error::ProposalError;
use crate::message::Message;

/// The protocol's offset fields are capped at six decimal digits.
pub const PROTOCOL_OFFSET_LIMIT: usize = 999_999;

/// Maximum number of proposals in one block.
pub const MAX_BLOCK_SIZE: usize = 5;

/// Proposal codes: the letter following `F` on a proposal line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropCode {
    /// `FA`: plain-text FBB message (not offered by this implementation).
    Ascii,
    /// `FB`: compressed FBB B/B1 message.
    Compressed,
    /// `FC`: Winlink extended B2 message.
    Wl2k,
    /// `FD`: gzip-compressed B2 message (experimental).
    Gzip,
}

impl PropCode {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'A' => Some(PropCode::Ascii),
            'B' => Some(PropCode::Compressed),
            'C' => Some(PropCode::Wl2k),
            'D' => Some(PropCode::Gzip),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            PropCode::Ascii => 'A',
            PropCode::Compressed => 'B',
            PropCode::Wl2k => 'C',
            PropCode::Gzip => 'D',
        }
    }
}

/// The local or remote verdict on one proposal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProposalAnswer {
    Accept,
    Reject,
    /// Ask again in a later session.
    #[default]
    Defer,
}

impl ProposalAnswer {
    /// The character we put in an `FS` answer line.
    pub fn as_char(&self) -> char {
        match self {
            ProposalAnswer::Accept => '+',
            ProposalAnswer::Reject => '-',
            ProposalAnswer::Defer => '=',
        }
    }
}

/// Metadata for one message offered in one direction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Proposal {
    pub(crate) code: Option<PropCode>,
    pub(crate) msg_type: String,
    pub(crate) mid: String,
    pub(crate) size: usize,
    pub(crate) compressed_size: usize,
    pub(crate) title: String,
    pub(crate) offset: usize,
    pub(crate) answer: ProposalAnswer,
    pub(crate) compressed_data: Vec<u8>,
}

impl Proposal {
    /// Build an outbound proposal by serializing and compressing `msg`.
    pub fn from_message(msg: &Message, code: PropCode) -> Result<Self, ProposalError> {
        msg.validate()?;
        if code != PropCode::Wl2k {
            return Err(ProposalError::UnknownCode(code.as_char()));
        }

        let plain = msg.to_bytes();
        let compressed =
            hamlink_lzhuf::encode(&plain, true).map_err(ProposalError::Compression)?;

        Ok(Self {
            code: Some(code),
            msg_type: "EM".to_string(),
            mid: msg.mid().to_string(),
            size: plain.len(),
            compressed_size: compressed.len(),
            title: msg.subject(),
            offset: 0,
            answer: ProposalAnswer::default(),
            compressed_data: compressed,
        })
    }

    pub fn code(&self) -> Option<PropCode> {
        self.code
    }

    pub fn mid(&self) -> &str {
        &self.mid
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn compressed_size(&self) -> usize {
        self.compressed_size
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn set_offset(&mut self, offset: usize) {
        self.offset = offset;
    }

    pub fn answer(&self) -> ProposalAnswer {
        self.answer
    }

    pub fn set_answer(&mut self, answer: ProposalAnswer) {
        self.answer = answer;
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn compressed_data(&self) -> &[u8] {
        &self.compressed_data
    }

    pub fn set_compressed_data(&mut self, data: Vec<u8>) {
        self.compressed_data = data;
    }

    /// Decompress and parse the transferred message.
    pub fn message(&self) -> Result<Message, ProposalError> {
        let plain = hamlink_lzhuf::decode(&self.compressed_data, true).map_err(|e| match e {
            hamlink_lzhuf::Error::Io(e) => ProposalError::Compression(e),
            hamlink_lzhuf::Error::Checksum => ProposalError::Compression(
                std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()),
            ),
        })?;
        Message::parse(&plain).map_err(ProposalError::Message)
    }

    /// Render the proposal line, without the trailing CR.
    pub fn proposal_line(&self) -> String {
        format!(
            "F{} {} {} {} {} 0",
            self.code.map(|c| c.as_char()).unwrap_or('C'),
            self.msg_type,
            self.mid,
            self.size,
            self.compressed_size,
        )
    }
}

/// Parse a proposal line of the form `F<code> <type> <mid> <n> <n> <n>`.
pub fn parse_proposal_line(line: &str) -> Result<Proposal, ProposalError> {
    let syntax = || ProposalError::Syntax(line.to_string());

    let rest = line.strip_prefix('F').ok_or_else(syntax)?;
    let mut chars = rest.chars();
    let code_char = chars.next().ok_or_else(syntax)?;
    let code = PropCode::from_char(code_char);

    let fields: Vec<&str> = chars.as_str().split_ascii_whitespace().collect();
    if fields.len() < 5 {
        return Err(syntax());
    }
    let msg_type = fields[0].to_string();
    let mid = fields[1].to_string();
    if mid.len() > 12 {
        return Err(syntax());
    }
    let size: usize = fields[2].parse().map_err(|_| syntax())?;
    let compressed_size: usize = fields[3].parse().map_err(|_| syntax())?;

    Ok(Proposal {
        code,
        msg_type,
        mid,
        size,
        compressed_size,
        ..Proposal::default()
    })
}

/// Parse an `FS` answer line, assigning one answer per proposal in order.
///
/// `A`/`a`/`!` answers carry a decimal resume offset; offsets beyond the
/// six-digit protocol limit are ignored (reset to zero), as deployed clients
/// are known to request them.
pub fn parse_answer_line(line: &str, proposals: &mut [Proposal]) -> Result<(), ProposalError> {
    let mut rest = line.strip_prefix("FS ").unwrap_or(line);

    let mut i = 0;
    while let Some(c) = rest.chars().next() {
        rest = &rest[c.len_utf8()..];
        let prop = proposals
            .get_mut(i)
            .ok_or(ProposalError::TooManyAnswers)?;
        i += 1;

        match c {
            'Y' | 'y' | '+' => prop.answer = ProposalAnswer::Accept,
            'N' | 'n' | 'R' | 'r' | '-' => prop.answer = ProposalAnswer::Reject,
            'L' | 'l' | '=' | 'H' | 'h' => prop.answer = ProposalAnswer::Defer,
            'A' | 'a' | '!' => {
                let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
                if digits == 0 {
                    return Err(ProposalError::MissingOffset);
                }
                prop.answer = ProposalAnswer::Accept;
                let offset = rest[..digits].parse::<usize>();
                rest = &rest[digits..];
                match offset {
                    Ok(offset) if offset <= PROTOCOL_OFFSET_LIMIT => prop.offset = offset,
                    // Deployed clients are known to request impossible
                    // offsets; restart from zero instead of failing.
                    Ok(_) | Err(_) => {
                        warn!(
                            mid = %prop.mid,
                            "requested offset exceeds the protocol limit, ignoring"
                        );
                        prop.offset = 0;
                    }
                }
            }
            other => return Err(ProposalError::InvalidAnswer(other)),
        }
    }
    Ok(())
}

/// Render an `FS` answer line for a block of answered proposals.
pub fn answer_line(proposals: &[Proposal]) -> String {
    let mut line = String::with_capacity(3 + proposals.len());
    line.push_str("FS ");
    for p in proposals {
        line.push(p.answer.as_char());
    }
    line
}

/// Precedence classes embedded in message titles, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Flash,
    Immediate,
    Priority,
    Routine,
}

fn precedence(title: &str) -> Precedence {
    let tag = title.find("//WL2K ").and_then(|idx| {
        let mut chars = title[idx + "//WL2K ".len()..].chars();
        let tag = chars.next()?;
        (chars.next()? == '/').then_some(tag.to_ascii_uppercase())
    });
    match tag {
        Some('Z') => Precedence::Flash,
        Some('O') | Some('E') => Precedence::Immediate,
        Some('P') => Precedence::Priority,
        _ => Precedence::Routine,
    }
}

/// Order proposals for transmission: by precedence class, then (for routine
/// traffic only) by ascending compressed size. The sort is stable, so equal
/// keys keep their insertion order.
pub fn sort_proposals(proposals: &mut [Proposal]) {
    proposals.sort_by_key(|p| {
        let prec = precedence(&p.title);
        let size = if prec == Precedence::Routine {
            p.compressed_size
        } else {
            0
        };
        (prec, size)
    });
}

/// Compute the additive checksum of a proposal block: the negated low byte
/// of the sum over every byte of every proposal line, CR included.
pub fn block_checksum<'a>(lines: impl IntoIterator<Item = &'a str>) -> u8 {
    let mut sum: i64 = 0;
    for line in lines {
        for b in line.bytes() {
            sum += b as i64;
        }
        sum += b'\r' as i64;
    }
    ((-sum) & 0xFF) as u8
}
