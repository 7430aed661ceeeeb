// acl_message.rs
// Core FIPA ACL message structures

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Agent identifier
///
/// Opaque, comparable handle naming a participant. Used as message
/// sender/receiver and as a map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From, Into)]
#[display("{name}")]
pub struct AgentId {
    pub name: String,
}

impl AgentId {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// FIPA performative types used by the room protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Performative {
    AcceptProposal,
    Agree,
    Cfp,
    Failure,
    Inform,
    Propose,
    Refuse,
    RejectProposal,
    Request,
    Subscribe,
}

impl Performative {
    pub fn as_str(&self) -> &'static str {
        match self {
            Performative::AcceptProposal => "accept-proposal",
            Performative::Agree => "agree",
            Performative::Cfp => "cfp",
            Performative::Failure => "failure",
            Performative::Inform => "inform",
            Performative::Propose => "propose",
            Performative::Refuse => "refuse",
            Performative::RejectProposal => "reject-proposal",
            Performative::Request => "request",
            Performative::Subscribe => "subscribe",
        }
    }
}

impl fmt::Display for Performative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complete ACL message
///
/// Immutable once handed to the bus. `reply_with` is unique per outbound
/// message that expects a correlated reply; replies echo it in `in_reply_to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclMessage {
    pub performative: Performative,
    pub sender: AgentId,
    pub receivers: Vec<AgentId>,
    pub content: String,
    pub conversation_id: Option<String>,
    pub reply_with: Option<String>,
    pub in_reply_to: Option<String>,
}

impl AclMessage {
    pub fn new(performative: Performative, sender: AgentId) -> Self {
        Self {
            performative,
            sender,
            receivers: Vec::new(),
            content: String::new(),
            conversation_id: None,
            reply_with: None,
            in_reply_to: None,
        }
    }

    /// Add a receiver, keeping the first occurrence of duplicates
    pub fn with_receiver(mut self, receiver: AgentId) -> Self {
        if !self.receivers.contains(&receiver) {
            self.receivers.push(receiver);
        }
        self
    }

    pub fn with_receivers(self, receivers: impl IntoIterator<Item = AgentId>) -> Self {
        receivers
            .into_iter()
            .fold(self, |msg, receiver| msg.with_receiver(receiver))
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn with_reply_with(mut self, reply_with: impl Into<String>) -> Self {
        self.reply_with = Some(reply_with.into());
        self
    }

    /// Build a reply addressed to this message's sender.
    ///
    /// The conversation id is copied and `in_reply_to` echoes `reply_with`,
    /// which is what initiator templates match on.
    pub fn create_reply(&self, sender: AgentId, performative: Performative) -> AclMessage {
        AclMessage {
            performative,
            sender,
            receivers: vec![self.sender.clone()],
            content: String::new(),
            conversation_id: self.conversation_id.clone(),
            reply_with: None,
            in_reply_to: self.reply_with.clone(),
        }
    }

    /// Render the logical wire shape as JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let msg = AclMessage::new(Performative::Cfp, AgentId::new("manager"))
            .with_receivers([AgentId::new("lamp"), AgentId::new("blinds"), AgentId::new("lamp")])
            .with_content("increase-illuminance")
            .with_conversation_id("cfp-increase-illuminance");

        assert_eq!(msg.performative, Performative::Cfp);
        assert_eq!(msg.receivers, vec![AgentId::new("lamp"), AgentId::new("blinds")]);
        assert_eq!(msg.content, "increase-illuminance");
    }

    #[test]
    fn test_reply_echoes_correlation_fields() {
        let msg = AclMessage::new(Performative::Subscribe, AgentId::new("manager"))
            .with_receiver(AgentId::new("env"))
            .with_conversation_id("subscribe-read-weather")
            .with_reply_with("subscribe-1");

        let reply = msg.create_reply(AgentId::new("env"), Performative::Agree);
        assert_eq!(reply.receivers, vec![AgentId::new("manager")]);
        assert_eq!(reply.sender, AgentId::new("env"));
        assert_eq!(reply.conversation_id.as_deref(), Some("subscribe-read-weather"));
        assert_eq!(reply.in_reply_to.as_deref(), Some("subscribe-1"));
        assert!(reply.reply_with.is_none());
    }

    #[test]
    fn test_wire_shape_json() {
        let msg = AclMessage::new(Performative::AcceptProposal, AgentId::new("manager"))
            .with_content("raise-blinds");
        let json = msg.to_json().unwrap();
        assert!(json.contains("\"performative\":\"accept-proposal\""));
        assert!(json.contains("\"sender\":{\"name\":\"manager\"}"));
        assert_eq!(AgentId::new("lamp").to_string(), "lamp");
    }

    #[test]
    fn test_agent_id_conversions() {
        let id: AgentId = String::from("lamp-controller").into();
        assert_eq!(id, AgentId::new("lamp-controller"));
        assert_eq!(id.to_string(), "lamp-controller");

        let name: String = id.into();
        assert_eq!(name, "lamp-controller");
    }
}
