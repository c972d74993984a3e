//! Transport abstractions for the session engine.
//!
//! A [`Transport`] is any ordered byte-stream duplex. Modem-backed transports
//! additionally expose optional capabilities (robust-mode switching, transmit
//! buffer introspection, flush-to-air), which the session feature-detects
//! through default trait methods.
//!
//! Concrete TNC and modem drivers live outside this crate; what lives here is
//! the trait they implement, the URL form used to address a remote station,
//! and the process-wide registry mapping URL schemes to dialers.

mod dial;
mod error;
mod traits;
mod url;

pub use dial::{dial_url, register_dialer, unregister_dialer, Dialer, DialerRegistry};
pub use error::TransportError;
pub use traits::Transport;
pub use url::TransportUrl;
