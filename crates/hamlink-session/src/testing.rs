//! In-memory mailbox plumbing for tests and examples.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use hamlink_core::{Message, PropCode, Proposal, ProposalAnswer};

use crate::handler::{HandlerError, MailboxHandler};

#[derive(Default)]
struct MemoryState {
    outbox: Vec<Message>,
    inbox: Vec<Message>,
    sent: Vec<String>,
    rejected: Vec<String>,
    deferred: HashSet<String>,
    known: HashSet<String>,
}

/// A [`MailboxHandler`] backed by plain memory.
///
/// The handle is cheaply cloneable; hand one clone to the session and keep
/// another to inspect the mailbox after the exchange.
#[derive(Clone, Default)]
pub struct MemoryHandler {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a message for sending.
    pub fn add_outbound(&self, msg: Message) {
        self.lock().outbox.push(msg);
    }

    /// Pretend `mid` was already received, so new offers of it are rejected.
    pub fn mark_known(&self, mid: &str) {
        self.lock().known.insert(mid.to_string());
    }

    /// Messages still waiting to go out.
    pub fn outbox_count(&self) -> usize {
        self.lock().outbox.len()
    }

    /// Messages received so far.
    pub fn inbox(&self) -> Vec<Message> {
        self.lock().inbox.clone()
    }

    /// MIDs the remote accepted from us.
    pub fn sent_mids(&self) -> Vec<String> {
        self.lock().sent.clone()
    }

    /// MIDs the remote rejected (it already had them).
    pub fn rejected_mids(&self) -> Vec<String> {
        self.lock().rejected.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MailboxHandler for MemoryHandler {
    fn outbound(&mut self) -> Vec<Proposal> {
        let state = self.lock();
        state
            .outbox
            .iter()
            .filter(|m| !state.deferred.contains(m.mid()))
            .filter_map(|m| Proposal::from_message(m, PropCode::Wl2k).ok())
            .collect()
    }

    fn inbound_answer(&mut self, prop: &Proposal) -> ProposalAnswer {
        if self.lock().known.contains(prop.mid()) {
            ProposalAnswer::Reject
        } else {
            ProposalAnswer::Accept
        }
    }

    fn process_inbound(&mut self, msg: Message) -> Result<(), HandlerError> {
        let mut state = self.lock();
        state.known.insert(msg.mid().to_string());
        state.inbox.push(msg);
        Ok(())
    }

    fn set_sent(&mut self, mid: &str, rejected: bool) {
        let mut state = self.lock();
        state.outbox.retain(|m| m.mid() != mid);
        if rejected {
            state.rejected.push(mid.to_string());
        } else {
            state.sent.push(mid.to_string());
        }
    }

    fn set_deferred(&mut self, mid: &str) {
        self.lock().deferred.insert(mid.to_string());
    }
}
