//! The B2F store-and-forward session engine.
//!
//! A [`Session`] drives one complete exchange between a local and a remote
//! callsign over any [`hamlink_transport::Transport`]: SID handshake,
//! proposal blocks with additive checksums, compressed body transfers with
//! SOH/STX/EOT framing and per-message offset restart, turnover, and
//! termination.
//!
//! The session owns the conversation on the caller's task; the only
//! concurrency it introduces is a best-effort status publisher per in-flight
//! transfer. Mailbox policy (what to offer, what to accept, where received
//! messages go) is delegated to a [`MailboxHandler`].
//!
//! ```no_run
//! # async fn demo(conn: &mut tokio::net::TcpStream) -> Result<(), hamlink_session::SessionError> {
//! use hamlink_session::Session;
//!
//! let mut session = Session::new("LA5NTA", "LA1B-10", "JO39EQ", None);
//! let stats = session.exchange(conn).await?;
//! println!("sent {} received {}", stats.sent.len(), stats.received.len());
//! # Ok(())
//! # }
//! ```

mod error;
mod handler;
mod inbound;
mod outbound;
mod pm;
mod session;
mod sid;
mod status;
pub mod testing;
mod wire;

pub use error::SessionError;
pub use handler::{HandlerError, MailboxHandler};
pub use pm::PendingMessage;
pub use session::{RobustMode, Session, TrafficStats};
pub use sid::Sid;
pub use status::{Status, StatusReporter};
