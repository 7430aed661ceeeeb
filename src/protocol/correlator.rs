// protocol/correlator.rs - Conversation Correlation

use crate::acl_message::{AclMessage, Performative};

/// Predicate over incoming messages, used to pick one exchange's replies
/// out of an agent's inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageTemplate {
    /// Matches every message
    Any,
    Performative(Performative),
    ConversationId(String),
    InReplyTo(String),
    And(Box<MessageTemplate>, Box<MessageTemplate>),
}

impl MessageTemplate {
    pub fn match_performative(performative: Performative) -> Self {
        MessageTemplate::Performative(performative)
    }

    pub fn match_conversation_id(conversation_id: impl Into<String>) -> Self {
        MessageTemplate::ConversationId(conversation_id.into())
    }

    pub fn match_in_reply_to(reply_tag: impl Into<String>) -> Self {
        MessageTemplate::InReplyTo(reply_tag.into())
    }

    pub fn and(self, other: MessageTemplate) -> Self {
        MessageTemplate::And(Box::new(self), Box::new(other))
    }

    pub fn matches(&self, msg: &AclMessage) -> bool {
        match self {
            MessageTemplate::Any => true,
            MessageTemplate::Performative(p) => msg.performative == *p,
            MessageTemplate::ConversationId(id) => msg.conversation_id.as_deref() == Some(id),
            MessageTemplate::InReplyTo(tag) => msg.in_reply_to.as_deref() == Some(tag),
            MessageTemplate::And(a, b) => a.matches(msg) && b.matches(msg),
        }
    }
}

/// Generate a collision-resistant reply tag
pub fn new_reply_tag(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

pub fn cfp_topic(service_type: &str) -> String {
    format!("cfp-{service_type}")
}

pub fn accept_topic(service_type: &str, offer: &str) -> String {
    format!("accept-{service_type}-{offer}")
}

pub fn subscribe_topic(service_type: &str) -> String {
    format!("subscribe-{service_type}")
}

pub fn request_topic(service_type: &str) -> String {
    format!("request-{service_type}")
}

/// One outbound exchange: its topic and the reply tag minted for it.
///
/// Stamping a message with a conversation sets `conversation_id` and
/// `reply_with`; the matching template accepts replies carrying both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    topic: String,
    reply_tag: String,
}

impl Conversation {
    pub fn open(topic: impl Into<String>, tag_prefix: &str) -> Self {
        Self {
            topic: topic.into(),
            reply_tag: new_reply_tag(tag_prefix),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn reply_tag(&self) -> &str {
        &self.reply_tag
    }

    pub fn stamp(&self, msg: AclMessage) -> AclMessage {
        msg.with_conversation_id(self.topic.clone())
            .with_reply_with(self.reply_tag.clone())
    }

    pub fn template(&self) -> MessageTemplate {
        MessageTemplate::match_conversation_id(self.topic.clone())
            .and(MessageTemplate::match_in_reply_to(self.reply_tag.clone()))
    }
}
