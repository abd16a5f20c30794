//! Group reconciliation.
//!
//! The automation API hands back chats in several shapes. Each shape is a
//! variant here and `GroupRecord::reconcile` maps it to one canonical record.

use serde::{Deserialize, Serialize};

const GROUP_SUFFIX: &str = "@g.us";
const UNNAMED_GROUP: &str = "Unnamed Group";

/// Chat id as returned by the API: a bare string or a wid object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatId {
    Plain(String),
    Wid {
        #[serde(rename = "_serialized")]
        serialized: String,
    },
}

impl ChatId {
    pub fn as_str(&self) -> &str {
        match self {
            ChatId::Plain(s) => s,
            ChatId::Wid { serialized } => serialized,
        }
    }
}

/// Raw chat entry. Every field besides `id` is optional in the wild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChat {
    #[serde(default)]
    pub id: Option<ChatId>,
    #[serde(default)]
    pub is_group: Option<bool>,
    #[serde(default)]
    pub is_group_chat: Option<bool>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub formatted_title: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub pushname: Option<String>,
}

/// Canonical group record returned by GET_GROUPS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub id: String,
    pub name: String,
}

impl GroupRecord {
    /// Returns `None` for anything that is not a group with a real group id.
    pub fn reconcile(chat: &RawChat) -> Option<Self> {
        let id = chat.id.as_ref()?.as_str();
        // isGroup / isGroupChat flags are not enough on their own: the id must be a group wid
        if !id.contains(GROUP_SUFFIX) {
            return None;
        }

        let name = [&chat.name, &chat.formatted_title, &chat.subject, &chat.pushname]
            .into_iter()
            .flatten()
            .find(|n| !n.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| UNNAMED_GROUP.to_string());

        Some(Self {
            id: id.to_string(),
            name,
        })
    }

    pub fn reconcile_all(chats: &[RawChat]) -> Vec<Self> {
        chats.iter().filter_map(Self::reconcile).collect()
    }
}
