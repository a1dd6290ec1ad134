//! Activity log entry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Area of the system an activity belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Post,
    Page,
    Category,
    Tag,
    Comment,
    FriendLink,
    Menu,
    Widget,
    Settings,
    Theme,
    Account,
    Mention,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Page => "page",
            Self::Category => "category",
            Self::Tag => "tag",
            Self::Comment => "comment",
            Self::FriendLink => "friend_link",
            Self::Menu => "menu",
            Self::Widget => "widget",
            Self::Settings => "settings",
            Self::Theme => "theme",
            Self::Account => "account",
            Self::Mention => "mention",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| format!("Invalid event type: {}", s))
    }
}

/// Recorded activity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLog {
    pub id: i64,
    pub event_type: EventType,
    pub event_time: DateTime<Utc>,
    pub actor: Option<String>,
    pub operation: String,
    pub target_name: Option<String>,
    pub meta: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Entry to append; time and id are assigned on insert
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub event_type: EventType,
    pub actor: Option<String>,
    pub operation: String,
    pub target_name: Option<String>,
    pub meta: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl NewActivity {
    pub fn new(event_type: EventType, operation: impl Into<String>) -> Self {
        Self {
            event_type,
            actor: None,
            operation: operation.into(),
            target_name: None,
            meta: None,
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn target(mut self, name: impl Into<String>) -> Self {
        self.target_name = Some(name.into());
        self
    }

    pub fn actor(mut self, actor: Option<&str>) -> Self {
        self.actor = actor.map(str::to_string);
        self
    }

    pub fn meta(mut self, meta: serde_json::Value) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn client(mut self, ip: Option<&str>, user_agent: Option<&str>) -> Self {
        self.ip_address = ip.map(str::to_string);
        self.user_agent = user_agent.map(str::to_string);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_from_str() {
        assert_eq!("friend_link".parse::<EventType>().unwrap(), EventType::FriendLink);
        assert_eq!("post".parse::<EventType>().unwrap(), EventType::Post);
        assert!("nope".parse::<EventType>().is_err());
    }

    #[test]
    fn test_new_activity_builder() {
        let entry = NewActivity::new(EventType::Post, "Published post")
            .target("Hello")
            .actor(Some("admin"))
            .client(Some("1.2.3.4"), None);
        assert_eq!(entry.target_name.as_deref(), Some("Hello"));
        assert_eq!(entry.actor.as_deref(), Some("admin"));
        assert_eq!(entry.ip_address.as_deref(), Some("1.2.3.4"));
        assert!(entry.user_agent.is_none());
    }
}
