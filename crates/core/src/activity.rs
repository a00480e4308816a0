use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wire-level activity kind. Anything beyond the two kinds this bot
/// handles keeps its wire name verbatim so diagnostics can echo it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivityType {
    Message,
    ConversationUpdate,
    Other(String),
}

impl ActivityType {
    pub fn as_str(&self) -> &str {
        match self {
            ActivityType::Message => "message",
            ActivityType::ConversationUpdate => "conversationUpdate",
            ActivityType::Other(name) => name,
        }
    }
}

impl From<String> for ActivityType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "message" => ActivityType::Message,
            "conversationUpdate" => ActivityType::ConversationUpdate,
            _ => ActivityType::Other(value),
        }
    }
}

impl From<ActivityType> for String {
    fn from(value: ActivityType) -> Self {
        match value {
            ActivityType::Other(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelAccount {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationAccount {
    pub id: String,
}

/// One inbound event unit as delivered by the hosting runtime, or one
/// outbound reply written back through the turn context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,
}

impl Activity {
    /// A bare message activity, used by the CLI one-shot path and tests.
    pub fn message(text: &str) -> Self {
        Self {
            activity_type: ActivityType::Message,
            id: Some(uuid::Uuid::new_v4().to_string()),
            timestamp: Some(Utc::now()),
            channel_id: None,
            service_url: None,
            from: None,
            recipient: None,
            conversation: None,
            text: Some(text.to_string()),
            reply_to_id: None,
        }
    }

    /// Build a message reply addressed back along this activity's
    /// conversation: accounts swapped, threading id set.
    pub fn reply(&self, text: &str) -> Self {
        Self {
            activity_type: ActivityType::Message,
            id: Some(uuid::Uuid::new_v4().to_string()),
            timestamp: Some(Utc::now()),
            channel_id: self.channel_id.clone(),
            service_url: self.service_url.clone(),
            from: self.recipient.clone(),
            recipient: self.from.clone(),
            conversation: self.conversation.clone(),
            text: Some(text.to_string()),
            reply_to_id: self.id.clone(),
        }
    }
}
