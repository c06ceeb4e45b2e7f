use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::MAX_COMMENT_CHARS;

// --- Typed IDs ---

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, Hash)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }
            pub fn as_str(&self) -> &str {
                &self.0
            }
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

typed_id!(MediaId);
typed_id!(EventId);
typed_id!(UserId);

// --- Users ---

/// A user as the API returns it, both as comment author and as liker.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct UserRef {
    #[serde(rename = "_id", default)]
    pub id: UserId,
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_img_url: Option<String>,
}

impl UserRef {
    /// Identity used for lookups: `_id` when present, otherwise `userId`.
    pub fn key(&self) -> Option<&UserId> {
        if !self.id.is_empty() {
            return Some(&self.id);
        }
        self.user_id.as_ref().filter(|id| !id.is_empty())
    }

    pub fn display_name(&self) -> Option<String> {
        let name = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let name = name.trim();
        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }

    pub fn initials(&self) -> String {
        self.first_name
            .chars()
            .next()
            .into_iter()
            .chain(self.last_name.chars().next())
            .flat_map(char::to_uppercase)
            .collect()
    }

    /// Avatar URL, treating an empty string like a missing one.
    pub fn avatar_url(&self) -> Option<&str> {
        self.profile_img_url.as_deref().filter(|url| !url.is_empty())
    }
}

// --- Comments ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Comment {
    pub created_by: UserId,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("comment is empty")]
    Blank,
    #[error("comment too long ({len} > {max} characters)")]
    TooLong { len: usize, max: usize },
}

/// Comment text that passed the submit checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentText(String);

impl CommentText {
    pub fn new(text: &str) -> Result<Self, DraftError> {
        if text.trim().is_empty() {
            return Err(DraftError::Blank);
        }
        let len = text.chars().count();
        if len > MAX_COMMENT_CHARS {
            return Err(DraftError::TooLong {
                len,
                max: MAX_COMMENT_CHARS,
            });
        }
        Ok(Self(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Input fields cap at the comment limit rather than rejecting keystrokes.
pub fn clamp_draft(text: String) -> String {
    if text.chars().count() <= MAX_COMMENT_CHARS {
        return text;
    }
    text.chars().take(MAX_COMMENT_CHARS).collect()
}

// --- Media ---

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    #[serde(alias = "image")]
    Photo,
    Video,
}

impl MediaKind {
    pub const fn noun(self) -> &'static str {
        match self {
            Self::Photo => "Photo",
            Self::Video => "Video",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct MediaItem {
    #[serde(rename = "_id")]
    pub id: MediaId,
    #[serde(default)]
    pub event_id: EventId,
    /// Empty when the uploader is unknown; anyone may delete such items.
    #[serde(default)]
    pub uploaded_by: UserId,
    #[serde(rename = "media_type", default)]
    pub kind: MediaKind,
    #[serde(default)]
    pub presigned_get_url: String,
    #[serde(default)]
    pub likes: Vec<UserRef>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub liked_by_user: bool,
}

impl MediaItem {
    pub fn can_be_deleted_by(&self, user: Option<&UserRef>) -> bool {
        if self.uploaded_by.is_empty() {
            return true;
        }
        user.is_some_and(|u| u.id == self.uploaded_by)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct EventDetails {
    #[serde(rename = "_id")]
    pub id: EventId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<UserRef>,
    #[serde(default)]
    pub members: Vec<UserRef>,
}

impl EventDetails {
    /// Everyone who can author comments on the event's media.
    pub fn member_list(&self) -> Vec<&UserRef> {
        self.host.iter().chain(self.members.iter()).collect()
    }
}

/// Comment authors by identity, derived from the event roster.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UidLookup(HashMap<UserId, UserRef>);

impl UidLookup {
    pub fn from_roster<'a>(members: impl IntoIterator<Item = &'a UserRef>) -> Self {
        let map = members
            .into_iter()
            .filter_map(|user| user.key().map(|key| (key.clone(), user.clone())))
            .collect();
        Self(map)
    }

    pub fn get(&self, id: &UserId) -> Option<&UserRef> {
        self.0.get(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Navigation payload the media screen is mounted with.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MediaRoute {
    pub item: MediaItem,
    pub event_details: EventDetails,
}
