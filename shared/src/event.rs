use serde::{Deserialize, Serialize};

use crate::capabilities::{MediaLibraryResult, PermissionResult};
use crate::model::{MediaItem, MediaRoute, UserRef};
use crate::reactions::ReactionsPayload;
use crate::{AppError, Config};

/// Identifies one mount of the media screen. Completions carry the
/// generation they were issued under and are dropped once it is stale.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Generation(pub u64);

impl Generation {
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Actions from the action sheet, run after the sheet has animated away.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SheetAction {
    Save,
    Delete,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum Event {
    // Shell lifecycle
    Configure(Box<Config>),
    ScreenOpened(Box<MediaRoute>),
    ScreenClosed,

    // Media screen
    CommentDraftChanged(String),
    SubmitComment,
    ToggleFavorite { intended: bool },
    OpenLikes,
    ActionSheetToggled,
    PreviewToggled,
    SheetActionSelected(SheetAction),
    SaveToDevice,
    DeleteMedia,

    // Reactions screen
    ReactionsOpened(Box<ReactionsPayload>),
    ReactionsClosed,

    DismissToast,
    DismissAlert,

    // Capability completions
    #[serde(skip)]
    CurrentUserLoaded {
        generation: Generation,
        result: Result<Option<UserRef>, AppError>,
    },
    #[serde(skip)]
    PlayableLocated {
        generation: Generation,
        result: MediaLibraryResult,
    },
    #[serde(skip)]
    BusyTimerElapsed { generation: Generation, busy: bool },
    #[serde(skip)]
    SheetActionDue {
        generation: Generation,
        action: SheetAction,
    },
    #[serde(skip)]
    CommentAdded {
        generation: Generation,
        result: Result<(), AppError>,
    },
    #[serde(skip)]
    MediaRefetched {
        generation: Generation,
        result: Box<Result<MediaItem, AppError>>,
    },
    #[serde(skip)]
    FavoriteSet {
        generation: Generation,
        intended: bool,
        result: Result<(), AppError>,
    },
    #[serde(skip)]
    MediaDeleted {
        generation: Generation,
        result: Result<(), AppError>,
    },
    #[serde(skip)]
    StoragePermissionChecked {
        generation: Generation,
        result: PermissionResult,
    },
    #[serde(skip)]
    StoragePermissionRequested {
        generation: Generation,
        result: PermissionResult,
    },
    #[serde(skip)]
    MediaSaved {
        generation: Generation,
        result: MediaLibraryResult,
    },
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Configure(_) => "configure",
            Self::ScreenOpened(_) => "screen_opened",
            Self::ScreenClosed => "screen_closed",
            Self::CommentDraftChanged(_) => "comment_draft_changed",
            Self::SubmitComment => "submit_comment",
            Self::ToggleFavorite { .. } => "toggle_favorite",
            Self::OpenLikes => "open_likes",
            Self::ActionSheetToggled => "action_sheet_toggled",
            Self::PreviewToggled => "preview_toggled",
            Self::SheetActionSelected(_) => "sheet_action_selected",
            Self::SaveToDevice => "save_to_device",
            Self::DeleteMedia => "delete_media",
            Self::ReactionsOpened(_) => "reactions_opened",
            Self::ReactionsClosed => "reactions_closed",
            Self::DismissToast => "dismiss_toast",
            Self::DismissAlert => "dismiss_alert",
            Self::CurrentUserLoaded { .. } => "current_user_loaded",
            Self::PlayableLocated { .. } => "playable_located",
            Self::BusyTimerElapsed { .. } => "busy_timer_elapsed",
            Self::SheetActionDue { .. } => "sheet_action_due",
            Self::CommentAdded { .. } => "comment_added",
            Self::MediaRefetched { .. } => "media_refetched",
            Self::FavoriteSet { .. } => "favorite_set",
            Self::MediaDeleted { .. } => "media_deleted",
            Self::StoragePermissionChecked { .. } => "storage_permission_checked",
            Self::StoragePermissionRequested { .. } => "storage_permission_requested",
            Self::MediaSaved { .. } => "media_saved",
        }
    }

    /// Completion events scoped to one screen mount.
    #[must_use]
    pub const fn generation(&self) -> Option<Generation> {
        match self {
            Self::CurrentUserLoaded { generation, .. }
            | Self::PlayableLocated { generation, .. }
            | Self::BusyTimerElapsed { generation, .. }
            | Self::SheetActionDue { generation, .. }
            | Self::CommentAdded { generation, .. }
            | Self::MediaRefetched { generation, .. }
            | Self::FavoriteSet { generation, .. }
            | Self::MediaDeleted { generation, .. }
            | Self::StoragePermissionChecked { generation, .. }
            | Self::StoragePermissionRequested { generation, .. }
            | Self::MediaSaved { generation, .. } => Some(*generation),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        matches!(
            self,
            Self::CommentDraftChanged(_)
                | Self::SubmitComment
                | Self::ToggleFavorite { .. }
                | Self::OpenLikes
                | Self::ActionSheetToggled
                | Self::PreviewToggled
                | Self::SheetActionSelected(_)
                | Self::SaveToDevice
                | Self::DeleteMedia
                | Self::DismissToast
                | Self::DismissAlert
        )
    }
}
