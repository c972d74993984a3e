//! The receiving half of a turn: proposal blocks, answers and compressed
//! body reception.

use std::collections::HashSet;

use tracing::{debug, info};

use hamlink_core::{
    answer_line, decode_text, parse_fw, parse_proposal_line, PropCode, Proposal, ProposalAnswer,
};
use hamlink_transport::Transport;

use crate::error::SessionError;
use crate::pm::PendingMessage;
use crate::session::Session;
use crate::status::{Direction, Monitor};

const SOH: u8 = 0x01;
const STX: u8 = 0x02;
const EOT: u8 = 0x04;
const NUL: u8 = 0x00;

impl Session {
    /// Run the receiving side of one turn.
    ///
    /// Returns `true` when the remote closed the session with `FQ`.
    pub(crate) async fn handle_inbound<T: Transport + ?Sized>(
        &mut self,
        conn: &mut T,
    ) -> Result<bool, SessionError> {
        let mut proposals: Vec<Proposal> = Vec::new();
        let mut checksum: i64 = 0;

        loop {
            let line = self.rd.read_line(conn).await?;

            if line.starts_with(";PM:") {
                if let Some(pm) = PendingMessage::parse(&line) {
                    self.pending_messages.insert(pm.mid.clone(), pm);
                }
                continue;
            }
            if let Some(fw) = parse_fw(&line) {
                self.remote_fw = fw;
                continue;
            }
            if line.is_empty() || line.starts_with(';') {
                continue;
            }
            if let Some(rest) = line.strip_prefix("***") {
                return Err(SessionError::Remote(rest.trim().to_string()));
            }
            if line.len() < 2 || !line.starts_with('F') {
                return Err(SessionError::Protocol(format!(
                    "got unexpected protocol line: {line:?}"
                )));
            }

            match &line.as_bytes()[..2] {
                b"FA" | b"FB" | b"FC" | b"FD" => {
                    for b in line.bytes() {
                        checksum += b as i64;
                    }
                    checksum += b'\r' as i64;
                    proposals.push(parse_proposal_line(&line)?);
                }
                b"FF" => {
                    self.remote_no_msgs = true;
                    return Ok(false);
                }
                b"FQ" => {
                    if !proposals.is_empty() {
                        return Err(SessionError::QuitWhilePending);
                    }
                    return Ok(true);
                }
                b"F>" => {
                    let computed = ((-checksum) & 0xFF) as u8;
                    let received =
                        u8::from_str_radix(line[2..].trim(), 16).unwrap_or_default();
                    if computed != received {
                        return Err(SessionError::BlockChecksum { computed, received });
                    }

                    if proposals.is_empty() {
                        self.remote_no_msgs = true;
                        return Ok(false);
                    }
                    self.remote_no_msgs = false;
                    info!(count = proposals.len(), "proposals received");

                    let n_accepted = self.answer_block(conn, &mut proposals).await?;
                    if n_accepted == 0 {
                        // Nothing to fetch; the remote keeps the floor and
                        // may offer another block.
                        proposals.clear();
                        checksum = 0;
                        continue;
                    }

                    for prop in proposals.iter_mut() {
                        if prop.answer() != ProposalAnswer::Accept {
                            continue;
                        }
                        self.read_compressed(conn, prop).await?;
                        let msg = prop.message()?;
                        if let Some(h) = self.handler.as_mut() {
                            h.process_inbound(msg).map_err(SessionError::Handler)?;
                        }
                        self.traffic.received.push(prop.mid().to_string());
                    }
                    // At least one message moved; turnover is implied.
                    return Ok(false);
                }
                _ => {
                    return Err(SessionError::Protocol(format!(
                        "unknown protocol command in {line:?}"
                    )))
                }
            }
        }
    }

    /// Decide and send the `FS` answer for one proposal block. Returns the
    /// number of accepted proposals.
    async fn answer_block<T: Transport + ?Sized>(
        &mut self,
        conn: &mut T,
        proposals: &mut [Proposal],
    ) -> Result<usize, SessionError> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut unanswered: Vec<usize> = Vec::new();

        for (idx, prop) in proposals.iter_mut().enumerate() {
            if seen.contains(prop.mid()) {
                // Radio-only gateways sometimes offer the same MID twice in
                // one batch; defer the copies until one has landed.
                debug!(mid = %prop.mid(), "deferring duplicate proposal");
                prop.set_answer(ProposalAnswer::Defer);
            } else if prop.code() != Some(PropCode::Wl2k) {
                debug!(mid = %prop.mid(), "deferring proposal (unsupported format)");
                prop.set_answer(ProposalAnswer::Defer);
            } else if self.handler.is_none() {
                debug!(mid = %prop.mid(), "deferring proposal (no handler)");
                prop.set_answer(ProposalAnswer::Defer);
            } else {
                unanswered.push(idx);
            }
            seen.insert(prop.mid().to_string());
        }

        if let Some(handler) = self.handler.as_mut() {
            let block: Vec<Proposal> = unanswered.iter().map(|&i| proposals[i].clone()).collect();
            let answers = handler.inbound_answers(&block);
            for (&idx, answer) in unanswered.iter().zip(answers) {
                proposals[idx].set_answer(answer);
            }
        }

        let n_accepted = proposals
            .iter()
            .filter(|p| p.answer() == ProposalAnswer::Accept)
            .inspect(|p| info!(mid = %p.mid(), "accepting message"))
            .count();

        self.write_line(conn, &answer_line(proposals)).await?;
        Ok(n_accepted)
    }

    /// Receive one compressed body in the SOH/STX/EOT envelope, verifying
    /// its additive checksum and size.
    async fn read_compressed<T: Transport + ?Sized>(
        &mut self,
        conn: &mut T,
        prop: &mut Proposal,
    ) -> Result<(), SessionError> {
        match self.rd.read_byte(conn).await? {
            SOH => {}
            b'*' => {
                // An error line is underway; surface the rest of it.
                let line = self.rd.read_line(conn).await?;
                return Err(SessionError::Remote(
                    line.trim_start_matches('*').trim().to_string(),
                ));
            }
            other => {
                return Err(SessionError::Protocol(format!(
                    "first byte of body not as expected, got {other}"
                )))
            }
        }

        let header_len = self.rd.read_byte(conn).await? as usize;
        let title_raw = self.rd.read_until(conn, NUL).await?;
        let offset_raw = self.rd.read_until(conn, NUL).await?;

        let actual_len = title_raw.len() + offset_raw.len() + 2;
        if header_len != actual_len {
            return Err(SessionError::Protocol(format!(
                "body header length mismatch: expected {header_len}, got {actual_len}"
            )));
        }

        // Gateways put the raw subject here; decode it like one.
        prop.set_title(decode_text(&title_raw));

        let offset: usize = String::from_utf8_lossy(&offset_raw)
            .parse()
            .map_err(|_| {
                SessionError::Protocol(format!(
                    "body offset not parseable as integer: {:?}",
                    String::from_utf8_lossy(&offset_raw)
                ))
            })?;
        if offset != prop.offset() {
            return Err(SessionError::Protocol(format!(
                "expected body offset {}, got {offset}",
                prop.offset()
            )));
        }

        info!(title = %prop.title(), offset, "receiving message");

        let monitor = Monitor::spawn(self.status.clone(), prop, Direction::Receiving);
        let mut buf: Vec<u8> = Vec::with_capacity(prop.compressed_size());
        let mut checksum: u32 = 0;

        loop {
            match self.rd.read_byte(conn).await? {
                STX => {
                    let mut len = self.rd.read_byte(conn).await? as usize;
                    if len == 0 {
                        len = 256;
                    }
                    let chunk = self.rd.read_exact(conn, len).await?;
                    for &b in &chunk {
                        checksum = (checksum + b as u32) % 256;
                    }
                    buf.extend_from_slice(&chunk);
                    monitor.update(buf.len());
                }
                EOT => {
                    let trailer = self.rd.read_byte(conn).await?;
                    checksum = (checksum + trailer as u32) % 256;
                    if checksum != 0 {
                        return Err(SessionError::BodyChecksum);
                    }
                    if prop.compressed_size() != buf.len() {
                        return Err(SessionError::Protocol(format!(
                            "body length mismatch after EOT: proposed {}, received {}",
                            prop.compressed_size(),
                            buf.len()
                        )));
                    }
                    let received = buf.len();
                    prop.set_compressed_data(buf);
                    monitor.finish(received);
                    return Ok(());
                }
                other => {
                    return Err(SessionError::Protocol(format!(
                        "unexpected byte in compressed stream: {other}"
                    )))
                }
            }
        }
    }
}
