// network/bus.rs - In-process Message Bus

use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use crate::acl_message::{AclMessage, AgentId};
use crate::observability::{record_message_dropped, record_message_received, record_message_sent};
use crate::protocol::MessageTemplate;
use crate::tools::MessageSniffer;

/// Inbox of a single agent
///
/// Messages from one sender keep their send order; matching takes the
/// oldest queued message that satisfies the template.
#[derive(Debug, Default)]
pub struct Mailbox {
    queue: Mutex<VecDeque<AclMessage>>,

    /// Total deliveries, used by the scheduler to wake blocked behaviours
    arrivals: AtomicU64,
}

impl Mailbox {
    fn push(&self, message: AclMessage) {
        self.queue.lock().push_back(message);
        self.arrivals.fetch_add(1, Ordering::AcqRel);
    }

    /// Non-blocking: remove and return the first message matching `template`
    pub fn take_first(&self, template: &MessageTemplate) -> Option<AclMessage> {
        let mut queue = self.queue.lock();
        let index = queue.iter().position(|m| template.matches(m))?;
        let message = queue.remove(index)?;
        record_message_received(message.performative.as_str());
        Some(message)
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn arrivals(&self) -> u64 {
        self.arrivals.load(Ordering::Acquire)
    }
}

/// Point-to-point asynchronous delivery between agent identities
#[derive(Debug, Default)]
pub struct MessageBus {
    /// Registered inboxes (agent -> mailbox)
    mailboxes: DashMap<AgentId, Arc<Mailbox>>,

    /// Optional trace of delivered messages
    sniffer: Option<Arc<MessageSniffer>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a sniffer that records every delivery
    pub fn with_sniffer(mut self, sniffer: Arc<MessageSniffer>) -> Self {
        self.sniffer = Some(sniffer);
        self
    }

    pub fn sniffer(&self) -> Option<&Arc<MessageSniffer>> {
        self.sniffer.as_ref()
    }

    /// Create (or return the existing) inbox for an agent
    pub fn register(&self, agent: &AgentId) -> Arc<Mailbox> {
        self.mailboxes
            .entry(agent.clone())
            .or_insert_with(|| {
                debug!(agent = %agent, "Mailbox registered");
                Arc::new(Mailbox::default())
            })
            .clone()
    }

    pub fn deregister(&self, agent: &AgentId) {
        if self.mailboxes.remove(agent).is_some() {
            debug!(agent = %agent, "Mailbox removed");
        }
    }

    pub fn is_registered(&self, agent: &AgentId) -> bool {
        self.mailboxes.contains_key(agent)
    }

    /// Fire-and-forget delivery to every receiver.
    ///
    /// Returns the number of inboxes the message reached. Unknown receivers
    /// are dropped with a warning; there is no acknowledgement.
    pub fn send(&self, message: AclMessage) -> usize {
        record_message_sent(message.performative.as_str());

        let mut delivered = 0;
        for receiver in &message.receivers {
            let mailbox = self.mailboxes.get(receiver).map(|m| m.value().clone());
            match mailbox {
                Some(mailbox) => {
                    mailbox.push(message.clone());
                    delivered += 1;
                }
                None => {
                    warn!(
                        receiver = %receiver,
                        performative = %message.performative,
                        "Dropping message for unknown receiver"
                    );
                    record_message_dropped(message.performative.as_str());
                }
            }
        }

        if delivered > 0 {
            if let Some(sniffer) = &self.sniffer {
                sniffer.record(&message);
            }
        }

        delivered
    }

    /// Non-blocking receive on behalf of `agent`
    pub fn receive(&self, agent: &AgentId, template: &MessageTemplate) -> Option<AclMessage> {
        let mailbox = self.mailboxes.get(agent).map(|m| m.value().clone())?;
        mailbox.take_first(template)
    }

    /// Number of queued, not yet consumed messages for `agent`
    pub fn pending(&self, agent: &AgentId) -> usize {
        self.mailboxes
            .get(agent)
            .map(|m| m.len())
            .unwrap_or(0)
    }
}
