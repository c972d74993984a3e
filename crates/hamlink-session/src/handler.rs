//! The mailbox side of a session.

use hamlink_core::{Message, Proposal, ProposalAnswer};

/// Errors a mailbox implementation may raise while storing a message.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Mailbox policy consulted by the session.
///
/// The session asks the handler what to offer, what verdict to give on each
/// inbound proposal, and tells it the fate of every MID. A session without a
/// handler defers everything it is offered and has nothing to send.
pub trait MailboxHandler: Send {
    /// Proposals for the messages waiting to go out. Called again after each
    /// proposal block, so messages marked sent or deferred must no longer be
    /// returned.
    fn outbound(&mut self) -> Vec<Proposal>;

    /// The verdict on a single inbound proposal.
    fn inbound_answer(&mut self, prop: &Proposal) -> ProposalAnswer;

    /// Verdicts for a whole block at once. The default consults
    /// [`inbound_answer`](MailboxHandler::inbound_answer) per proposal;
    /// implementations that can answer a batch more cheaply (one database
    /// query, one dial to a backing store) override this.
    fn inbound_answers(&mut self, props: &[Proposal]) -> Vec<ProposalAnswer> {
        props.iter().map(|p| self.inbound_answer(p)).collect()
    }

    /// Store a fully received message.
    fn process_inbound(&mut self, msg: Message) -> Result<(), HandlerError>;

    /// The remote has answered an outbound message: either it was
    /// transferred (`rejected == false`) or the remote already has it.
    fn set_sent(&mut self, mid: &str, rejected: bool);

    /// The remote (or the session itself) deferred an outbound message to a
    /// later session.
    fn set_deferred(&mut self, mid: &str);
}
