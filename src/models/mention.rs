//! Webmention / pingback record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Protocol a mention arrived through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MentionWorker {
    Webmention,
    Pingback,
}

impl MentionWorker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Webmention => "webmention",
            Self::Pingback => "pingback",
        }
    }
}

impl std::str::FromStr for MentionWorker {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "webmention" => Ok(Self::Webmention),
            "pingback" => Ok(Self::Pingback),
            _ => Err(format!("Invalid mention worker: {}", s)),
        }
    }
}

/// A remote page linking to one of our posts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mention {
    pub id: i64,
    pub domain: String,
    pub source_url: String,
    pub source_title: String,
    pub source_ip: Option<String>,
    pub target_post_id: i64,
    pub target_post_title: String,
    pub worker: MentionWorker,
    pub ping_time: DateTime<Utc>,
}
