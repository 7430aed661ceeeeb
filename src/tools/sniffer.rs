// tools/sniffer.rs - Message Sniffer
//
//! Message Sniffer for the room platform
//!
//! The sniffer records every message the bus delivers, for debugging and
//! for asserting on conversations in tests.
//!
//! # Features
//!
//! - Bounded ring of trace entries
//! - Filter by sender, receiver, performative or conversation
//! - JSON export of the captured trace

use crate::acl_message::{AclMessage, Performative};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::trace;

/// Sniffer configuration
#[derive(Debug, Clone)]
pub struct SnifferConfig {
    /// Maximum number of messages to retain
    pub max_messages: usize,
}

impl Default for SnifferConfig {
    fn default() -> Self {
        Self { max_messages: 10_000 }
    }
}

/// Filter for sniffer queries
#[derive(Debug, Clone, Default)]
pub struct SnifferFilter {
    /// Filter by sender name
    pub sender: Option<String>,

    /// Filter by receiver name
    pub receiver: Option<String>,

    /// Filter by performative
    pub performative: Option<Performative>,

    /// Filter by conversation ID
    pub conversation_id: Option<String>,
}

impl SnifferFilter {
    fn matches(&self, entry: &TraceEntry) -> bool {
        let msg = &entry.message;
        self.sender.as_ref().is_none_or(|s| msg.sender.name == *s)
            && self
                .receiver
                .as_ref()
                .is_none_or(|r| msg.receivers.iter().any(|a| a.name == *r))
            && self.performative.is_none_or(|p| msg.performative == p)
            && self
                .conversation_id
                .as_ref()
                .is_none_or(|c| msg.conversation_id.as_ref() == Some(c))
    }
}

/// A single trace entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Sequence number, increasing across the sniffer's lifetime
    pub id: u64,

    /// Capture timestamp
    pub timestamp: DateTime<Utc>,

    /// The delivered message
    pub message: AclMessage,
}

#[derive(Debug, Default)]
struct SnifferInner {
    entries: VecDeque<TraceEntry>,
    next_id: u64,
}

/// Message sniffer shared by the bus
#[derive(Debug, Default)]
pub struct MessageSniffer {
    config: SnifferConfig,
    inner: RwLock<SnifferInner>,
}

impl MessageSniffer {
    pub fn new(config: SnifferConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(SnifferInner::default()),
        }
    }

    /// Record a delivered message, evicting the oldest entry when full
    pub fn record(&self, message: &AclMessage) {
        if self.config.max_messages == 0 {
            return;
        }

        let mut inner = self.inner.write();
        let id = inner.next_id;
        inner.next_id += 1;

        if inner.entries.len() >= self.config.max_messages {
            inner.entries.pop_front();
        }

        trace!(
            id,
            performative = %message.performative,
            sender = %message.sender,
            "Sniffed message"
        );

        inner.entries.push_back(TraceEntry {
            id,
            timestamp: Utc::now(),
            message: message.clone(),
        });
    }

    /// Entries matching a filter, oldest first
    pub fn query(&self, filter: &SnifferFilter) -> Vec<TraceEntry> {
        self.inner
            .read()
            .entries
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect()
    }

    /// Count of entries per performative
    pub fn performative_counts(&self) -> HashMap<Performative, usize> {
        let mut counts = HashMap::new();
        for entry in self.inner.read().entries.iter() {
            *counts.entry(entry.message.performative).or_insert(0) += 1;
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.inner.write().entries.clear();
    }

    /// Export the retained trace to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let inner = self.inner.read();
        let entries: Vec<&TraceEntry> = inner.entries.iter().collect();
        serde_json::to_string_pretty(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl_message::AgentId;

    fn msg(performative: Performative, from: &str, to: &str) -> AclMessage {
        AclMessage::new(performative, AgentId::new(from)).with_receiver(AgentId::new(to))
    }

    #[test]
    fn test_bounded_capture() {
        let sniffer = MessageSniffer::new(SnifferConfig { max_messages: 2 });
        sniffer.record(&msg(Performative::Cfp, "manager", "lamp"));
        sniffer.record(&msg(Performative::Propose, "lamp", "manager"));
        sniffer.record(&msg(Performative::AcceptProposal, "manager", "lamp"));

        let entries = sniffer.query(&SnifferFilter::default());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, 1);
        assert_eq!(entries[1].message.performative, Performative::AcceptProposal);
    }

    #[test]
    fn test_filter() {
        let sniffer = MessageSniffer::new(SnifferConfig::default());
        sniffer.record(&msg(Performative::Cfp, "manager", "lamp"));
        sniffer.record(&msg(Performative::Cfp, "manager", "blinds"));
        sniffer.record(&msg(Performative::Refuse, "blinds", "manager"));

        let filter = SnifferFilter {
            receiver: Some("blinds".into()),
            ..Default::default()
        };
        assert_eq!(sniffer.query(&filter).len(), 1);

        let filter = SnifferFilter {
            performative: Some(Performative::Cfp),
            ..Default::default()
        };
        assert_eq!(sniffer.query(&filter).len(), 2);
        assert_eq!(sniffer.performative_counts()[&Performative::Refuse], 1);
        assert!(sniffer.to_json().unwrap().contains("blinds"));
    }
}
