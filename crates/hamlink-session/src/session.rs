//! The session object and its exchange loop.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use hamlink_core::Address;
use hamlink_transport::Transport;

use crate::error::SessionError;
use crate::handler::MailboxHandler;
use crate::pm::PendingMessage;
use crate::sid::Sid;
use crate::status::StatusReporter;
use crate::wire::WireReader;

/// Policy for toggling a transport's robust mode around body transfers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RobustMode {
    /// Robust is switched off while message bodies move, and restored after.
    #[default]
    Auto,
    /// Leave robust on for the whole session.
    Forced,
    /// Never touch robust mode.
    Disabled,
}

/// MIDs moved during one exchange.
#[derive(Debug, Clone, Default)]
pub struct TrafficStats {
    pub sent: Vec<String>,
    pub received: Vec<String>,
}

/// One B2F conversation between a local and a remote callsign.
///
/// A session is parameterized by role: the *master* (the calling station, or
/// the listener that accepted the link) speaks its banner first; the *slave*
/// answers the handshake and then offers its messages first. A session value
/// drives exactly one [`exchange`](Session::exchange).
pub struct Session {
    pub(crate) mycall: String,
    pub(crate) targetcall: String,
    pub(crate) locator: String,

    pub(crate) handler: Option<Box<dyn MailboxHandler>>,
    pub(crate) status: Option<Arc<dyn StatusReporter>>,

    pub(crate) master: bool,
    pub(crate) robust_mode: RobustMode,
    motd: Vec<String>,
    agent_name: String,
    agent_version: String,

    local_fw: Vec<Address>,
    pub(crate) remote_sid: Option<Sid>,
    pub(crate) remote_fw: Vec<Address>,
    pub(crate) pending_messages: HashMap<String, PendingMessage>,

    pub(crate) remote_no_msgs: bool,
    pub(crate) traffic: TrafficStats,
    pub(crate) rd: WireReader,
}

impl Session {
    /// Create a session between `mycall` and `targetcall`.
    ///
    /// `locator` is the local grid square announced in the handshake
    /// greeting. Without a `handler` the session defers every proposal it is
    /// offered and has nothing to send.
    pub fn new(
        mycall: &str,
        targetcall: &str,
        locator: &str,
        handler: Option<Box<dyn MailboxHandler>>,
    ) -> Session {
        Session {
            mycall: mycall.to_uppercase(),
            targetcall: targetcall.to_uppercase(),
            locator: locator.to_string(),
            handler,
            status: None,
            master: false,
            robust_mode: RobustMode::default(),
            motd: Vec::new(),
            agent_name: "hamlink".to_string(),
            agent_version: env!("CARGO_PKG_VERSION").to_string(),
            local_fw: vec![Address::from_string(mycall)],
            remote_sid: None,
            remote_fw: Vec::new(),
            pending_messages: HashMap::new(),
            remote_no_msgs: false,
            traffic: TrafficStats::default(),
            rd: WireReader::new(),
        }
    }

    /// Act as the master (initiating) side of the handshake.
    pub fn set_master(&mut self, master: bool) {
        self.master = master;
    }

    /// Free-text lines sent after our SID when we are master.
    pub fn set_motd(&mut self, motd: Vec<String>) {
        self.motd = motd;
    }

    pub fn set_robust_mode(&mut self, mode: RobustMode) {
        self.robust_mode = mode;
    }

    /// Override the program name/version announced in our SID.
    pub fn set_user_agent(&mut self, name: &str, version: &str) {
        self.agent_name = name.to_string();
        self.agent_version = version.to_string();
    }

    pub fn set_status_reporter(&mut self, reporter: Arc<dyn StatusReporter>) {
        self.status = Some(reporter);
    }

    /// Announce an extra address we accept traffic for (`;FW:` line).
    pub fn add_auxiliary_address(&mut self, addr: Address) {
        self.local_fw.push(addr);
    }

    /// The remote's parsed SID, available once the handshake completed.
    pub fn remote_sid(&self) -> Option<&Sid> {
        self.remote_sid.as_ref()
    }

    /// Addresses the remote forwards for, from its `;FW:` lines.
    pub fn remote_forwarders(&self) -> &[Address] {
        &self.remote_fw
    }

    /// Pending-message advisories seen so far, keyed by MID.
    pub fn pending_messages(&self) -> &HashMap<String, PendingMessage> {
        &self.pending_messages
    }

    fn local_sid(&self) -> String {
        Sid::local(&self.agent_name, &self.agent_version)
    }

    /// Run one complete exchange over `conn`.
    ///
    /// The connection must be a private, ordered byte stream; the session
    /// assumes nothing else reads or writes it. A session drives exactly one
    /// exchange; it keeps handshake state and must not be called again.
    /// Cancel by closing the connection: partially received messages are
    /// discarded and outbound messages mid-transfer stay unmarked so a later
    /// session can retry.
    pub async fn exchange<T: Transport + ?Sized>(
        &mut self,
        conn: &mut T,
    ) -> Result<TrafficStats, SessionError> {
        if self.robust_mode == RobustMode::Forced {
            conn.set_robust(true);
        }
        self.handshake(conn).await?;

        let mut my_turn = !self.master;
        loop {
            let done = if my_turn {
                self.handle_outbound(conn).await?
            } else {
                self.handle_inbound(conn).await?
            };
            if done {
                info!(
                    sent = self.traffic.sent.len(),
                    received = self.traffic.received.len(),
                    "session over"
                );
                return Ok(self.traffic.clone());
            }
            my_turn = !my_turn;
        }
    }

    async fn handshake<T: Transport + ?Sized>(
        &mut self,
        conn: &mut T,
    ) -> Result<(), SessionError> {
        if self.master {
            self.send_banner(conn).await?;
            self.read_client_handshake(conn).await
        } else {
            self.read_banner(conn).await?;
            self.send_client_handshake(conn).await
        }
    }

    /// Master: SID, optional MOTD lines, then the prompt.
    async fn send_banner<T: Transport + ?Sized>(&mut self, conn: &mut T) -> Result<(), SessionError> {
        let sid = self.local_sid();
        self.write_line(conn, &sid).await?;
        for line in self.motd.clone() {
            self.write_line(conn, &line).await?;
        }
        let prompt = format!("{} de {} >", self.targetcall, self.mycall);
        self.write_line(conn, &prompt).await?;
        Ok(())
    }

    /// Master: consume the client's `;FW:`/SID/comment block.
    async fn read_client_handshake<T: Transport + ?Sized>(
        &mut self,
        conn: &mut T,
    ) -> Result<(), SessionError> {
        loop {
            let line = self.rd.read_line(conn).await?;
            if let Some(rest) = line.strip_prefix("***") {
                return Err(SessionError::Remote(rest.trim().to_string()));
            }
            if let Some(fw) = hamlink_core::parse_fw(&line) {
                self.remote_fw = fw;
                continue;
            }
            if line.starts_with('[') {
                let sid = Sid::parse(&line)
                    .ok_or_else(|| SessionError::Protocol(format!("malformed SID: {line:?}")))?;
                if !sid.supports("B2F") {
                    return Err(SessionError::NoB2Support);
                }
                debug!(sid = %sid, "remote identified");
                self.remote_sid = Some(sid);
                return Ok(());
            }
            // Anything else before the SID is greeting chatter.
        }
    }

    /// Slave: scan the banner until the `>` prompt, catching the SID on the
    /// way.
    async fn read_banner<T: Transport + ?Sized>(&mut self, conn: &mut T) -> Result<(), SessionError> {
        loop {
            let line = self.rd.read_line(conn).await?;
            if let Some(rest) = line.strip_prefix("***") {
                return Err(SessionError::Remote(rest.trim().to_string()));
            }
            if line.starts_with('[') {
                let sid = Sid::parse(&line)
                    .ok_or_else(|| SessionError::Protocol(format!("malformed SID: {line:?}")))?;
                if !sid.supports("B2F") {
                    return Err(SessionError::NoB2Support);
                }
                debug!(sid = %sid, "remote identified");
                self.remote_sid = Some(sid);
                continue;
            }
            if line.ends_with('>') {
                break;
            }
        }
        if self.remote_sid.is_none() {
            return Err(SessionError::Protocol(
                "remote prompted without identifying itself".to_string(),
            ));
        }
        Ok(())
    }

    /// Slave: forwarding addresses, our SID, and the greeting comment.
    async fn send_client_handshake<T: Transport + ?Sized>(
        &mut self,
        conn: &mut T,
    ) -> Result<(), SessionError> {
        let fw = self
            .local_fw
            .iter()
            .map(|a| a.addr.clone())
            .collect::<Vec<_>>()
            .join(" ");
        self.write_line(conn, &format!(";FW: {fw}")).await?;
        let sid = self.local_sid();
        self.write_line(conn, &sid).await?;
        let greeting = format!("; {} DE {} ({})", self.targetcall, self.mycall, self.locator);
        self.write_line(conn, &greeting).await?;
        Ok(())
    }

    /// Write one CR-terminated protocol line.
    pub(crate) async fn write_line<T: Transport + ?Sized>(
        &mut self,
        conn: &mut T,
        line: &str,
    ) -> Result<(), SessionError> {
        debug!(target: "hamlink_session::wire", ">{line}");
        conn.write_all(line.as_bytes()).await?;
        conn.write_all(b"\r").await?;
        conn.flush().await?;
        Ok(())
    }

    /// After a turnover the only valid opening bytes are `F` and `;`;
    /// anything else is an out-of-band error report from the remote.
    pub(crate) async fn verify_turnover_response<T: Transport + ?Sized>(
        &mut self,
        conn: &mut T,
    ) -> Result<(), SessionError> {
        let next = self.rd.peek_byte(conn).await?;
        if next == b'F' || next == b';' {
            return Ok(());
        }
        let line = self.rd.read_line(conn).await?;
        if let Some(rest) = line.strip_prefix("***") {
            return Err(SessionError::Remote(rest.trim().to_string()));
        }
        Err(SessionError::UnexpectedResponse(line))
    }
}
