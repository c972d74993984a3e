//! The sending half of a turn: proposal blocks and compressed body
//! transmission.

use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use hamlink_core::{
    block_checksum, encode_header, parse_answer_line, sort_proposals, Proposal, ProposalAnswer,
    MAX_BLOCK_SIZE,
};
use hamlink_transport::Transport;

use crate::error::SessionError;
use crate::session::{RobustMode, Session};
use crate::status::{Direction, Monitor};

/// Chunk size for body frames. The protocol maximum is 255 (with 0 encoding
/// 256), but 125 keeps each frame inside an AX.25 paclen of 128.
const MAX_CHUNK: usize = 125;

const SOH: u8 = 0x01;
const STX: u8 = 0x02;
const EOT: u8 = 0x04;

impl Session {
    /// Run the sending side of one turn.
    ///
    /// Returns `true` when the session was closed with `FQ`.
    pub(crate) async fn handle_outbound<T: Transport + ?Sized>(
        &mut self,
        conn: &mut T,
    ) -> Result<bool, SessionError> {
        let mut accepted_mids: Vec<String> = Vec::new();

        loop {
            let mut outbound = self.outbound_proposals();
            if outbound.is_empty() {
                break;
            }
            outbound.truncate(MAX_BLOCK_SIZE);

            let n_accepted = self.send_block(conn, &mut outbound).await?;
            for prop in outbound.iter().filter(|p| p.answer() == ProposalAnswer::Accept) {
                accepted_mids.push(prop.mid().to_string());
            }

            if n_accepted > 0 {
                // The block moved messages; turnover is implied.
                self.verify_turnover_response(conn).await?;
                self.mark_accepted_sent(&accepted_mids);
                return Ok(false);
            }
            // Every proposal was rejected or deferred: the remote keeps
            // listening, so offer the next block (if any) without turnover.
        }

        if self.remote_no_msgs && accepted_mids.is_empty() {
            // The remote has nothing for us and nothing of ours moved this
            // turn: close. No response check is needed, since we transferred
            // nothing the remote could still complain about.
            self.write_line(conn, "FQ").await?;
            return Ok(true);
        }

        self.write_line(conn, "FF").await?;
        self.verify_turnover_response(conn).await?;
        Ok(false)
    }

    /// Proposals for the messages the mailbox wants out, highest precedence
    /// first.
    fn outbound_proposals(&mut self) -> Vec<Proposal> {
        let Some(handler) = self.handler.as_mut() else {
            return Vec::new();
        };
        let mut proposals = handler.outbound();
        sort_proposals(&mut proposals);
        proposals
    }

    /// Send one proposal block, read the answer and transfer the accepted
    /// bodies. Returns the number of accepted proposals.
    async fn send_block<T: Transport + ?Sized>(
        &mut self,
        conn: &mut T,
        outbound: &mut [Proposal],
    ) -> Result<usize, SessionError> {
        let lines: Vec<String> = outbound.iter().map(|p| p.proposal_line()).collect();
        for line in &lines {
            self.write_line(conn, line).await?;
        }
        let checksum = block_checksum(lines.iter().map(String::as_str));
        self.write_line(conn, &format!("F> {checksum:02X}")).await?;

        let reply = loop {
            let line = self.rd.read_line(conn).await?;
            if line.starts_with("FS ") {
                break line;
            }
            if let Some(rest) = line.strip_prefix("***") {
                return Err(SessionError::Remote(rest.trim().to_string()));
            }
            if line.is_empty() || line.starts_with(';') {
                continue; // comment
            }
            return Err(SessionError::Protocol(format!(
                "expected proposal answer from remote, got {line:?}"
            )));
        };
        parse_answer_line(&reply, outbound)?;

        let n_accepted = outbound
            .iter()
            .filter(|p| p.answer() == ProposalAnswer::Accept)
            .count();

        // Body transfers run fast; drop out of robust mode for them.
        let robust_toggled =
            n_accepted > 0 && self.robust_mode == RobustMode::Auto && conn.set_robust(false);

        let mut transfer_result = Ok(());
        for prop in outbound.iter() {
            match prop.answer() {
                ProposalAnswer::Defer => {
                    if let Some(h) = self.handler.as_mut() {
                        h.set_deferred(prop.mid());
                    }
                }
                ProposalAnswer::Reject => {
                    // Safe to record immediately: the remote already has it.
                    if let Some(h) = self.handler.as_mut() {
                        h.set_sent(prop.mid(), true);
                    }
                }
                ProposalAnswer::Accept => {
                    transfer_result = self.write_compressed(conn, prop).await;
                    if transfer_result.is_err() {
                        break;
                    }
                }
            }
        }
        if robust_toggled {
            conn.set_robust(true);
        }
        transfer_result?;

        Ok(n_accepted)
    }

    /// Record transferred messages once the turnover response confirmed the
    /// remote did not raise an error.
    fn mark_accepted_sent(&mut self, mids: &[String]) {
        for mid in mids {
            if let Some(h) = self.handler.as_mut() {
                h.set_sent(mid, false);
            }
            self.traffic.sent.push(mid.clone());
        }
    }

    /// Transmit one compressed body in the SOH/STX/EOT envelope, starting at
    /// the offset the remote requested.
    async fn write_compressed<T: Transport + ?Sized>(
        &mut self,
        conn: &mut T,
        prop: &Proposal,
    ) -> Result<(), SessionError> {
        info!(title = %prop.title(), offset = prop.offset(), "transmitting message");

        if prop.compressed_size() < 6 {
            // Smaller than the smallest valid LZHUF stream (the empty one).
            return Err(SessionError::InvalidBody);
        }

        let data = prop.compressed_data();
        let offset = if prop.offset() > data.len() {
            warn!(
                mid = %prop.mid(),
                offset = prop.offset(),
                "requested offset beyond the body, restarting from zero"
            );
            0
        } else {
            prop.offset()
        };

        // Title must be ASCII on the wire; word-encode like a subject.
        let title = encode_header(prop.title());
        let offset_str = offset.to_string();
        let header_len = (title.len() + offset_str.len() + 2) as u8;
        let mut head = Vec::with_capacity(2 + title.len() + offset_str.len() + 2);
        head.push(SOH);
        head.push(header_len);
        head.extend_from_slice(title.as_bytes());
        head.push(0);
        head.extend_from_slice(offset_str.as_bytes());
        head.push(0);
        conn.write_all(&head).await?;

        let monitor = Monitor::spawn(self.status.clone(), prop, Direction::Sending);
        let total = prop.compressed_size();
        let mut remaining = &data[offset..];
        let mut checksum: i64 = 0;

        while !remaining.is_empty() {
            let n = remaining.len().min(MAX_CHUNK);
            let (chunk, rest) = remaining.split_at(n);
            conn.write_all(&[STX, n as u8]).await?;
            conn.write_all(chunk).await?;
            for &b in chunk {
                checksum += b as i64;
            }
            remaining = rest;

            let tx_buffered = conn.tx_buffer_len().unwrap_or(0);
            let transferred = total.saturating_sub(remaining.len() + tx_buffered);
            monitor.update(transferred);
        }

        let checksum = ((-checksum) & 0xFF) as u8;
        conn.write_all(&[EOT, checksum]).await?;
        conn.flush().await?;

        // Block until the TNC reports the frames actually left, so the
        // turnover response is really an answer to the whole message.
        conn.flush_outgoing().await?;

        debug!(mid = %prop.mid(), "message body flushed");
        monitor.finish(total.saturating_sub(conn.tx_buffer_len().unwrap_or(0)));
        Ok(())
    }
}
