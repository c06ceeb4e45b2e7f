use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Comment, MediaKind, UserRef};
use crate::reactions::ReactionSet;
use crate::{
    format_comment_age, format_like_label, Model, ToastKind, ToastMessage, ViewState,
    UNKNOWN_USER_NAME,
};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ViewModel {
    pub media: Option<MediaDetailView>,
    pub reactions: Option<ReactionsView>,
    pub toast: Option<ToastView>,
    /// Blocking alert text; the shell shows it until `DismissAlert`.
    pub alert: Option<String>,
}

impl ViewModel {
    #[must_use]
    pub fn build(model: &Model, now_ms: u64) -> Self {
        Self {
            media: model
                .screen
                .as_ref()
                .map(|screen| MediaDetailView::build(screen, now_ms)),
            reactions: model.reactions.as_ref().map(ReactionsView::from),
            toast: model
                .active_toast
                .as_ref()
                .filter(|t| t.is_visible_at(now_ms))
                .map(ToastView::from),
            alert: model.alert.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaDetailView {
    pub media_id: String,
    pub kind: MediaKind,
    /// Local copy for videos when the shell has one, else the presigned URL.
    pub media_url: String,
    pub like_count: usize,
    pub like_label: String,
    pub liked: bool,
    pub comments: Vec<CommentView>,
    pub comment_draft: String,
    /// Signed-in user beside the comment input; `None` until the session loads.
    pub composer_avatar: Option<AvatarView>,
    pub can_submit_comment: bool,
    pub is_busy: bool,
    pub action_sheet: Option<ActionSheetView>,
    pub preview_open: bool,
    pub can_delete: bool,
}

impl MediaDetailView {
    #[must_use]
    pub fn build(screen: &ViewState, now_ms: u64) -> Self {
        let item = &screen.media_item;
        let media_url = screen
            .playable_uri
            .clone()
            .unwrap_or_else(|| item.presigned_get_url.clone());

        Self {
            media_id: item.id.to_string(),
            kind: item.kind,
            media_url,
            like_count: screen.like_count,
            like_label: format_like_label(screen.like_count),
            liked: screen.liked_by_current_user,
            comments: item
                .comments
                .iter()
                .map(|c| CommentView::build(c, screen, now_ms))
                .collect(),
            comment_draft: screen.comment_draft.clone(),
            composer_avatar: screen.current_user.as_ref().map(AvatarView::for_user),
            can_submit_comment: !screen.comment_draft.trim().is_empty(),
            is_busy: screen.is_busy,
            action_sheet: screen
                .action_sheet_open
                .then(|| ActionSheetView::for_kind(item.kind)),
            preview_open: screen.preview_open,
            can_delete: screen.can_delete(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionSheetView {
    pub save_label: String,
    pub delete_label: String,
}

impl ActionSheetView {
    #[must_use]
    pub fn for_kind(kind: MediaKind) -> Self {
        Self {
            save_label: format!("Save {}", kind.noun()),
            delete_label: format!("Delete {}", kind.noun()),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommentView {
    pub author_name: String,
    pub author_known: bool,
    pub avatar: AvatarView,
    pub message: String,
    pub time_ago: Option<String>,
}

impl CommentView {
    fn build(comment: &Comment, screen: &ViewState, now_ms: u64) -> Self {
        let author = screen.uid_lookup.get(&comment.created_by);
        let now = i64::try_from(now_ms)
            .ok()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single());
        let time_ago = comment
            .created_at
            .zip(now)
            .map(|(posted, now)| format_comment_age(posted, now));

        match author {
            Some(user) => Self {
                author_name: user
                    .display_name()
                    .unwrap_or_else(|| UNKNOWN_USER_NAME.to_string()),
                author_known: true,
                avatar: AvatarView::for_user(user),
                message: comment.message.clone(),
                time_ago,
            },
            None => Self {
                author_name: UNKNOWN_USER_NAME.to_string(),
                author_known: false,
                avatar: AvatarView::Initials {
                    text: "?".to_string(),
                },
                message: comment.message.clone(),
                time_ago,
            },
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AvatarView {
    Image { url: String },
    Initials { text: String },
}

impl AvatarView {
    #[must_use]
    pub fn for_user(user: &UserRef) -> Self {
        match user.avatar_url() {
            Some(url) => Self::Image {
                url: url.to_string(),
            },
            None => Self::Initials {
                text: user.initials(),
            },
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReactionsView {
    pub entries: Vec<ReactionEntryView>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReactionEntryView {
    pub user_id: String,
    pub display_name: String,
    pub avatar: AvatarView,
    pub show_reaction_icon: bool,
}

impl From<&ReactionSet> for ReactionsView {
    fn from(set: &ReactionSet) -> Self {
        let entries = set
            .users
            .iter()
            .map(|user| ReactionEntryView {
                user_id: user.id.to_string(),
                display_name: user
                    .display_name()
                    .unwrap_or_else(|| UNKNOWN_USER_NAME.to_string()),
                avatar: AvatarView::for_user(user),
                show_reaction_icon: !set.hide_reaction_icon,
            })
            .collect();
        Self { entries }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToastView {
    pub message: String,
    pub kind: ToastKind,
    pub duration_ms: u64,
}

impl From<&ToastMessage> for ToastView {
    fn from(t: &ToastMessage) -> Self {
        Self {
            message: t.message.clone(),
            kind: t.kind,
            duration_ms: t.kind.visible_for_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EventDetails, MediaId, MediaItem, MediaRoute, UserId};
    use crate::SAVED_MESSAGE;

    fn user(id: &str, first: &str, last: &str) -> UserRef {
        UserRef {
            id: UserId::new(id),
            first_name: first.into(),
            last_name: last.into(),
            ..UserRef::default()
        }
    }

    fn screen() -> ViewState {
        let item = MediaItem {
            id: MediaId::new("m1"),
            kind: MediaKind::Video,
            presigned_get_url: "https://cdn.example.com/m1.mp4".into(),
            likes: vec![user("u1", "Ada", "Lovelace")],
            comments: vec![
                Comment {
                    created_by: UserId::new("u1"),
                    message: "great shot".into(),
                    created_at: Some(Utc.timestamp_millis_opt(1_000_000).unwrap()),
                },
                Comment {
                    created_by: UserId::new("stranger"),
                    message: "who am i".into(),
                    created_at: None,
                },
            ],
            ..MediaItem::default()
        };
        let event_details = EventDetails {
            members: vec![user("u1", "Ada", "Lovelace")],
            ..EventDetails::default()
        };
        ViewState::new(MediaRoute {
            item,
            event_details,
        })
    }

    #[test]
    fn composer_shows_signed_in_user() {
        let mut screen = screen();
        assert_eq!(MediaDetailView::build(&screen, 0).composer_avatar, None);

        screen.current_user = Some(user("me", "Mae", "Owner"));
        assert_eq!(
            MediaDetailView::build(&screen, 0).composer_avatar,
            Some(AvatarView::Initials { text: "MO".into() })
        );
    }

    #[test]
    fn comments_resolve_authors() {
        let view = MediaDetailView::build(&screen(), 1_000_000 + 5 * 60_000);

        let known = &view.comments[0];
        assert_eq!(known.author_name, "Ada Lovelace");
        assert!(known.author_known);
        assert_eq!(known.avatar, AvatarView::Initials { text: "AL".into() });
        assert_eq!(known.time_ago.as_deref(), Some("5m ago"));

        let unknown = &view.comments[1];
        assert_eq!(unknown.author_name, UNKNOWN_USER_NAME);
        assert!(!unknown.author_known);
        assert_eq!(unknown.time_ago, None);
    }

    #[test]
    fn like_label_and_media_url() {
        let mut screen = screen();
        let view = MediaDetailView::build(&screen, 0);
        assert_eq!(view.like_label, "1 Likes");
        assert_eq!(view.media_url, "https://cdn.example.com/m1.mp4");

        screen.playable_uri = Some("file:///cache/m1.mp4".into());
        let view = MediaDetailView::build(&screen, 0);
        assert_eq!(view.media_url, "file:///cache/m1.mp4");
    }

    #[test]
    fn action_sheet_labels_follow_kind() {
        let mut screen = screen();
        assert!(MediaDetailView::build(&screen, 0).action_sheet.is_none());

        screen.action_sheet_open = true;
        let sheet = MediaDetailView::build(&screen, 0).action_sheet.unwrap();
        assert_eq!(sheet.save_label, "Save Video");
        assert_eq!(sheet.delete_label, "Delete Video");

        assert_eq!(
            ActionSheetView::for_kind(MediaKind::Photo).save_label,
            "Save Photo"
        );
    }

    #[test]
    fn submit_enabled_only_for_non_blank_draft() {
        let mut screen = screen();
        screen.comment_draft = "   ".into();
        assert!(!MediaDetailView::build(&screen, 0).can_submit_comment);
        screen.comment_draft = "hi".into();
        assert!(MediaDetailView::build(&screen, 0).can_submit_comment);
    }

    #[test]
    fn reaction_entries_respect_icon_flag() {
        let mut with_avatar = user("u2", "Grace", "Hopper");
        with_avatar.profile_img_url = Some("https://cdn.example.com/g.png".into());

        let set = ReactionSet {
            users: vec![user("u1", "Ada", "Lovelace"), with_avatar],
            hide_reaction_icon: true,
        };
        let view = ReactionsView::from(&set);

        assert_eq!(view.entries.len(), 2);
        assert!(view.entries.iter().all(|e| !e.show_reaction_icon));
        assert_eq!(view.entries[0].display_name, "Ada Lovelace");
        assert_eq!(
            view.entries[1].avatar,
            AvatarView::Image {
                url: "https://cdn.example.com/g.png".into()
            }
        );
    }

    #[test]
    fn expired_toast_is_hidden() {
        let mut model = Model::default();
        model.show_toast(SAVED_MESSAGE, ToastKind::Success);
        let shown = model.active_toast.as_ref().unwrap().shown_at_ms;

        let toast = ViewModel::build(&model, shown + 100).toast.unwrap();
        assert_eq!(toast.duration_ms, 2000);
        assert!(ViewModel::build(&model, shown + 60_000).toast.is_none());
    }
}
