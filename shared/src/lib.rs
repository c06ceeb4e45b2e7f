#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod capabilities;
pub mod event;
pub mod model;
pub mod reactions;
pub mod view;

use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::capabilities::http::ApiEndpoints;
use crate::capabilities::{MediaLibraryError, PermissionError};
use crate::event::Generation;
use crate::model::{DraftError, EventDetails, EventId, MediaId, MediaItem, MediaRoute, UidLookup, UserRef};
use crate::reactions::ReactionSet;

pub use app::App;
pub use capabilities::Capabilities;
pub use capabilities::Effect;
pub use crux_core::{render::Render, App as CruxApp};
pub use event::Event;
pub use view::ViewModel;

pub const MAX_COMMENT_CHARS: usize = 5000;
pub const DEFAULT_BUSY_DELAY_MS: u64 = 300;
pub const DEFAULT_ACTION_DELAY_MS: u64 = 500;

pub const STORAGE_PERMISSION_MESSAGE: &str =
    "You need to give storage permission to download the file";
pub const SAVED_MESSAGE: &str = "Saved successfully.";
pub const DELETE_FORBIDDEN_MESSAGE: &str = "You can't delete a file another user uploaded.";
pub const UNKNOWN_USER_NAME: &str = "Unknown user";

// --- Errors ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Transient,
    Permanent,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Network,
    Timeout,
    Authentication,
    Authorization,
    Validation,
    NotFound,
    Conflict,
    RateLimited,
    Configuration,
    Storage,
    Deserialization,
    PermissionDenied,
    FeatureUnavailable,
    InvalidState,
    Internal,
    Unknown,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Authentication => "AUTH_ERROR",
            Self::Authorization => "FORBIDDEN",
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::RateLimited => "RATE_LIMITED",
            Self::Configuration => "CONFIGURATION_ERROR",
            Self::Storage => "STORAGE_ERROR",
            Self::Deserialization => "DESERIALIZATION_ERROR",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::FeatureUnavailable => "FEATURE_UNAVAILABLE",
            Self::InvalidState => "INVALID_STATE",
            Self::Internal => "INTERNAL_ERROR",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::Network | Self::Timeout | Self::Conflict | Self::RateLimited | Self::Storage => {
                ErrorSeverity::Transient
            }

            Self::Configuration | Self::Deserialization | Self::Internal | Self::InvalidState => {
                ErrorSeverity::Fatal
            }

            Self::Authentication
            | Self::Authorization
            | Self::Validation
            | Self::NotFound
            | Self::PermissionDenied
            | Self::FeatureUnavailable
            | Self::Unknown => ErrorSeverity::Permanent,
        }
    }

    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Network | Self::Timeout | Self::RateLimited | Self::Storage | Self::Conflict
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub message: String,
    pub internal_message: Option<String>,
    pub context: HashMap<String, String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            internal_message: None,
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable() && !matches!(self.severity, ErrorSeverity::Fatal)
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Network => {
                "Unable to connect. Please check your internet connection and try again.".into()
            }
            ErrorKind::Timeout => "The request timed out. Please try again.".into(),
            ErrorKind::Authentication => "Your session has expired. Please sign in again.".into(),
            ErrorKind::Authorization => "You don't have permission to perform this action.".into(),
            ErrorKind::Validation | ErrorKind::FeatureUnavailable => self.message.clone(),
            ErrorKind::NotFound => "This photo or video is no longer available.".into(),
            ErrorKind::Conflict => {
                "This action conflicts with a recent change. Please refresh and try again.".into()
            }
            ErrorKind::RateLimited => "Too many requests. Please wait a moment and try again.".into(),
            ErrorKind::Storage => {
                "Unable to save to your device. Please free up some storage space.".into()
            }
            ErrorKind::PermissionDenied => STORAGE_PERMISSION_MESSAGE.into(),
            ErrorKind::Configuration
            | ErrorKind::Deserialization
            | ErrorKind::InvalidState
            | ErrorKind::Internal
            | ErrorKind::Unknown => {
                "An unexpected error occurred. Please try again or contact support.".into()
            }
        }
    }

    #[must_use]
    pub fn from_http_status(status: u16, body: Option<&[u8]>) -> Self {
        let kind = match status {
            400 | 422 => ErrorKind::Validation,
            401 => ErrorKind::Authentication,
            403 => ErrorKind::Authorization,
            404 | 410 => ErrorKind::NotFound,
            408 => ErrorKind::Timeout,
            409 => ErrorKind::Conflict,
            429 => ErrorKind::RateLimited,
            500..=599 => ErrorKind::Internal,
            _ => ErrorKind::Unknown,
        };

        let message = body
            .and_then(|b| serde_json::from_slice::<ApiErrorResponse>(b).ok())
            .map(|e| e.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("HTTP error: {status}"));

        Self::new(kind, message).with_context("http_status", status.to_string())
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    message: String,
}

impl From<DraftError> for AppError {
    fn from(e: DraftError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

impl From<PermissionError> for AppError {
    fn from(e: PermissionError) -> Self {
        let kind = match e {
            PermissionError::Unsupported { .. } => ErrorKind::FeatureUnavailable,
            PermissionError::Platform { .. } => ErrorKind::PermissionDenied,
        };
        AppError::new(kind, e.to_string())
    }
}

impl From<MediaLibraryError> for AppError {
    fn from(e: MediaLibraryError) -> Self {
        let kind = match e {
            MediaLibraryError::Download { .. } => ErrorKind::Network,
            MediaLibraryError::Storage { .. } => ErrorKind::Storage,
            MediaLibraryError::PermissionDenied => ErrorKind::PermissionDenied,
            MediaLibraryError::UnexpectedOutput { .. } => ErrorKind::Internal,
        };
        AppError::new(kind, e.to_string())
    }
}

// --- Formatting ---

/// Age label under a comment. Anything older than a week shows its date.
#[must_use]
pub fn format_comment_age(posted: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let age = now.signed_duration_since(posted);

    if age < Duration::minutes(1) {
        "Just now".into()
    } else if age < Duration::hours(1) {
        format!("{}m ago", age.num_minutes())
    } else if age < Duration::days(1) {
        format!("{}h ago", age.num_hours())
    } else if age < Duration::weeks(1) {
        format!("{}d ago", age.num_days())
    } else {
        posted.format("%b %-d, %Y").to_string()
    }
}

#[must_use]
pub fn format_like_label(count: usize) -> String {
    format!("{count} Likes")
}

#[must_use]
pub fn now_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

// --- Configuration ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    #[default]
    Ios,
    Android,
}

/// Shell-provided settings, delivered once through `Event::Configure`.
/// The bearer token is accepted from the shell but never serialized back.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    #[serde(skip_serializing)]
    pub auth_token: Option<SecretString>,
    pub platform: Platform,
    pub busy_delay_ms: u64,
    pub action_delay_ms: u64,
    /// Undo the optimistic favourite change when the server rejects it.
    pub rollback_failed_favorite: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            auth_token: None,
            platform: Platform::default(),
            busy_delay_ms: DEFAULT_BUSY_DELAY_MS,
            action_delay_ms: DEFAULT_ACTION_DELAY_MS,
            rollback_failed_favorite: false,
        }
    }
}

// --- Toasts ---

/// Short-lived notice over the media screen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToastMessage {
    pub message: String,
    pub kind: ToastKind,
    pub shown_at_ms: u64,
}

impl ToastMessage {
    #[must_use]
    pub fn new(message: impl Into<String>, kind: ToastKind, shown_at_ms: u64) -> Self {
        Self {
            message: message.into(),
            kind,
            shown_at_ms,
        }
    }

    #[must_use]
    pub fn is_visible_at(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.shown_at_ms) <= self.kind.visible_for_ms()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    /// Save to the device finished.
    Success,
    /// Action refused locally, e.g. deleting someone else's upload.
    Warning,
    /// Server rejected a change that was already shown.
    Error,
}

impl ToastKind {
    #[must_use]
    pub const fn visible_for_ms(self) -> u64 {
        match self {
            Self::Success => 2000,
            Self::Warning | Self::Error => 4000,
        }
    }
}

// --- State ---

/// Remote operations that must not overlap for the same media item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    AddComment,
    Favorite,
    Delete,
    Save,
}

pub type InFlightKey = (MediaId, OperationKind);

/// Everything the media screen shows, for one mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub media_item: MediaItem,
    pub event_details: EventDetails,
    pub uid_lookup: UidLookup,
    pub current_user: Option<UserRef>,
    pub like_count: usize,
    pub liked_by_current_user: bool,
    pub comment_draft: String,
    pub is_busy: bool,
    pub action_sheet_open: bool,
    pub preview_open: bool,
    pub playable_uri: Option<String>,
    pub last_error: Option<AppError>,
}

impl ViewState {
    #[must_use]
    pub fn new(route: MediaRoute) -> Self {
        let MediaRoute {
            item,
            event_details,
        } = route;
        let uid_lookup = UidLookup::from_roster(event_details.member_list());

        Self {
            like_count: item.likes.len(),
            liked_by_current_user: item.liked_by_user,
            media_item: item,
            event_details,
            uid_lookup,
            current_user: None,
            comment_draft: String::new(),
            is_busy: false,
            action_sheet_open: false,
            preview_open: false,
            playable_uri: None,
            last_error: None,
        }
    }

    /// The event the media belongs to; the route's event wins over the item's.
    #[must_use]
    pub fn event_id(&self) -> &EventId {
        if self.event_details.id.is_empty() {
            &self.media_item.event_id
        } else {
            &self.event_details.id
        }
    }

    pub fn apply_favorite(&mut self, intended: bool) {
        self.liked_by_current_user = intended;
        self.like_count = if intended {
            self.like_count.saturating_add(1)
        } else {
            self.like_count.saturating_sub(1)
        };
    }

    /// Server copy replaces media, likes and comments. The favourite flag is
    /// left alone since the refetch is not scoped to the current user.
    pub fn apply_refetch(&mut self, item: MediaItem) {
        self.like_count = item.likes.len();
        self.media_item = item;
    }

    #[must_use]
    pub fn can_delete(&self) -> bool {
        self.media_item
            .can_be_deleted_by(self.current_user.as_ref())
    }
}

pub struct Model {
    pub config: Config,
    pub endpoints: Option<ApiEndpoints>,
    pub generation: Generation,
    pub screen: Option<ViewState>,
    pub reactions: Option<ReactionSet>,
    pub in_flight: HashSet<InFlightKey>,
    pub active_toast: Option<ToastMessage>,
    pub alert: Option<String>,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            config: Config::default(),
            endpoints: None,
            generation: Generation::default(),
            screen: None,
            reactions: None,
            in_flight: HashSet::new(),
            active_toast: None,
            alert: None,
        }
    }
}

impl Model {
    pub fn show_toast(&mut self, message: impl Into<String>, kind: ToastKind) {
        self.active_toast = Some(ToastMessage::new(message, kind, now_ms()));
    }

    /// Marks `kind` as in flight for the open item. `false` when there is
    /// no screen or the same operation is already running.
    pub fn begin(&mut self, kind: OperationKind) -> bool {
        let Some(screen) = &self.screen else {
            return false;
        };
        self.in_flight.insert((screen.media_item.id.clone(), kind))
    }

    pub fn finish(&mut self, kind: OperationKind) {
        if let Some(screen) = &self.screen {
            self.in_flight.remove(&(screen.media_item.id.clone(), kind));
        }
    }

    #[must_use]
    pub fn is_in_flight(&self, kind: OperationKind) -> bool {
        self.screen
            .as_ref()
            .is_some_and(|s| self.in_flight.contains(&(s.media_item.id.clone(), kind)))
    }

    pub fn record_error(&mut self, error: AppError) {
        if let Some(screen) = self.screen.as_mut() {
            screen.last_error = Some(error);
        }
    }

    /// Builds an API URL for the open item.
    pub fn media_url(
        &self,
        build: impl FnOnce(&ApiEndpoints, &EventId, &MediaId) -> Result<String, AppError>,
    ) -> Result<String, AppError> {
        let endpoints = self.endpoints.as_ref().ok_or_else(|| {
            AppError::new(ErrorKind::Configuration, "API endpoints are not configured")
        })?;
        let screen = self
            .screen
            .as_ref()
            .ok_or_else(|| AppError::new(ErrorKind::InvalidState, "no media screen is open"))?;
        build(endpoints, screen.event_id(), &screen.media_item.id)
    }
}

pub mod app {
    use tracing::{debug, error, info, instrument, warn};
    use uuid::Uuid;

    use super::*;
    use crate::capabilities::http::{self, AddCommentRequest, SetFavoriteRequest, IDEMPOTENCY_HEADER};
    use crate::capabilities::kv::{decode_session_user, SESSION_USER_KEY};
    use crate::capabilities::{
        Capabilities, MediaLibraryOutput, MediaLibraryResult, Permission, PermissionResult,
    };
    use crate::event::SheetAction;
    use crate::model::{clamp_draft, CommentText, MediaKind};
    use crate::reactions::{likers_for_display, ReactionsPayload};

    #[derive(Default)]
    pub struct App;

    impl App {
        #[instrument(skip_all, fields(media_id = %route.item.id))]
        fn open_screen(route: MediaRoute, model: &mut Model, caps: &Capabilities) {
            model.generation = model.generation.next();
            model.in_flight.clear();
            model.alert = None;

            let screen = ViewState::new(route);
            let generation = model.generation;
            info!(
                generation = generation.0,
                likes = screen.like_count,
                comments = screen.media_item.comments.len(),
                "media screen opened"
            );

            caps.key_value.get(SESSION_USER_KEY.to_string(), move |result| {
                Event::CurrentUserLoaded {
                    generation,
                    result: decode_session_user(result),
                }
            });

            if screen.media_item.kind == MediaKind::Video {
                caps.media_library.locate_playable(
                    screen.media_item.id.clone(),
                    screen.media_item.presigned_get_url.clone(),
                    move |result| Event::PlayableLocated { generation, result },
                );
            }

            model.screen = Some(screen);
            caps.render.render();
        }

        fn close_screen(model: &mut Model, caps: &Capabilities) {
            if model.screen.take().is_some() {
                info!(generation = model.generation.0, "media screen closed");
            }
            model.generation = model.generation.next();
            model.in_flight.clear();
            model.alert = None;
            caps.render.render();
        }

        #[instrument(skip_all, fields(generation = model.generation.0))]
        fn submit_comment(model: &mut Model, caps: &Capabilities) {
            let Some(screen) = model.screen.as_mut() else {
                return;
            };

            let text = match CommentText::new(&screen.comment_draft) {
                Ok(text) => text,
                Err(DraftError::Blank) => {
                    debug!("ignoring blank comment");
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "comment rejected");
                    screen.last_error = Some(AppError::from(e));
                    caps.render.render();
                    return;
                }
            };

            if !model.begin(OperationKind::AddComment) {
                debug!("comment submission already in flight");
                return;
            }

            let generation = model.generation;
            caps.timer.start(model.config.busy_delay_ms, move || {
                Event::BusyTimerElapsed {
                    generation,
                    busy: true,
                }
            });

            let sent = model.media_url(ApiEndpoints::comments).and_then(|url| {
                http::authorized(caps.http.post(url), model.config.auth_token.as_ref())
                    .header(IDEMPOTENCY_HEADER, Uuid::new_v4().to_string())
                    .body_json(&AddCommentRequest {
                        message: text.as_str().to_string(),
                    })
                    .map_err(|e| AppError::from_http_error(&e))?
                    .send(move |result| Event::CommentAdded {
                        generation,
                        result: http::expect_success(result),
                    });
                Ok(())
            });

            if let Err(e) = sent {
                Self::comment_added(model, caps, Err(e));
            }
        }

        fn comment_added(model: &mut Model, caps: &Capabilities, result: Result<(), AppError>) {
            model.finish(OperationKind::AddComment);
            let Some(screen) = model.screen.as_mut() else {
                return;
            };

            screen.comment_draft.clear();
            match result {
                Ok(()) => info!(media_id = %screen.media_item.id, "comment added"),
                Err(e) => {
                    error!(error = %e, "failed to add comment");
                    screen.last_error = Some(e);
                }
            }

            Self::refetch_media(model, caps);
            caps.render.render();
        }

        fn refetch_media(model: &mut Model, caps: &Capabilities) {
            let generation = model.generation;
            let sent = model.media_url(ApiEndpoints::media).map(|url| {
                http::authorized(caps.http.get(url), model.config.auth_token.as_ref())
                    .expect_json::<MediaItem>()
                    .send(move |result| Event::MediaRefetched {
                        generation,
                        result: Box::new(http::decode_media(result)),
                    });
            });

            if let Err(e) = sent {
                Self::media_refetched(model, caps, Err(e));
            }
        }

        fn media_refetched(model: &mut Model, caps: &Capabilities, result: Result<MediaItem, AppError>) {
            if let Some(screen) = model.screen.as_mut() {
                match result {
                    Ok(item) => {
                        debug!(
                            likes = item.likes.len(),
                            comments = item.comments.len(),
                            "media refreshed"
                        );
                        screen.apply_refetch(item);
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to refresh media");
                        screen.last_error = Some(e);
                    }
                }
            }

            let generation = model.generation;
            caps.timer.start(model.config.busy_delay_ms, move || {
                Event::BusyTimerElapsed {
                    generation,
                    busy: false,
                }
            });
            caps.render.render();
        }

        #[instrument(skip_all, fields(intended = intended))]
        fn toggle_favorite(model: &mut Model, caps: &Capabilities, intended: bool) {
            let Some(screen) = model.screen.as_ref() else {
                return;
            };
            if screen.liked_by_current_user == intended {
                debug!("favourite already in requested state");
                return;
            }
            if !model.begin(OperationKind::Favorite) {
                debug!("favourite update already in flight");
                return;
            }

            if let Some(screen) = model.screen.as_mut() {
                screen.apply_favorite(intended);
            }

            let generation = model.generation;
            let sent = model.media_url(ApiEndpoints::favorite).and_then(|url| {
                http::authorized(caps.http.put(url), model.config.auth_token.as_ref())
                    .body_json(&SetFavoriteRequest {
                        is_favorited: intended,
                    })
                    .map_err(|e| AppError::from_http_error(&e))?
                    .send(move |result| Event::FavoriteSet {
                        generation,
                        intended,
                        result: http::expect_success(result),
                    });
                Ok(())
            });

            caps.render.render();
            if let Err(e) = sent {
                Self::favorite_set(model, caps, intended, Err(e));
            }
        }

        fn favorite_set(
            model: &mut Model,
            caps: &Capabilities,
            intended: bool,
            result: Result<(), AppError>,
        ) {
            model.finish(OperationKind::Favorite);

            let Err(e) = result else {
                debug!(intended, "favourite saved");
                return;
            };

            warn!(error = %e, intended, "failed to update favourite");
            if model.config.rollback_failed_favorite {
                if let Some(screen) = model.screen.as_mut() {
                    screen.apply_favorite(!intended);
                }
                model.show_toast(e.user_facing_message(), ToastKind::Error);
            }
            model.record_error(e);
            caps.render.render();
        }

        #[instrument(skip_all, fields(generation = model.generation.0))]
        fn delete_media(model: &mut Model, caps: &Capabilities) {
            let Some(screen) = model.screen.as_ref() else {
                return;
            };
            if !screen.can_delete() {
                warn!(
                    uploaded_by = %screen.media_item.uploaded_by,
                    "refusing to delete media uploaded by another user"
                );
                model.show_toast(DELETE_FORBIDDEN_MESSAGE, ToastKind::Warning);
                caps.render.render();
                return;
            }
            if !model.begin(OperationKind::Delete) {
                debug!("delete already in flight");
                return;
            }

            let generation = model.generation;
            let sent = model.media_url(ApiEndpoints::media).map(|url| {
                http::authorized(caps.http.delete(url), model.config.auth_token.as_ref()).send(
                    move |result| Event::MediaDeleted {
                        generation,
                        result: http::expect_success(result),
                    },
                );
            });

            if let Err(e) = sent {
                Self::media_deleted(model, caps, Err(e));
            }
        }

        fn media_deleted(model: &mut Model, caps: &Capabilities, result: Result<(), AppError>) {
            model.finish(OperationKind::Delete);
            match result {
                Ok(()) => {
                    info!("media deleted, leaving screen");
                    caps.navigation.pop();
                }
                Err(e) => {
                    error!(error = %e, "failed to delete media");
                    model.record_error(e);
                    caps.render.render();
                }
            }
        }

        #[instrument(skip_all, fields(platform = ?model.config.platform))]
        fn save_to_device(model: &mut Model, caps: &Capabilities) {
            if model.screen.is_none() {
                return;
            }
            if !model.begin(OperationKind::Save) {
                debug!("save already in flight");
                return;
            }

            match model.config.platform {
                Platform::Ios => Self::start_save(model, caps),
                Platform::Android => {
                    let generation = model.generation;
                    caps.permissions.check(Permission::StorageWrite, move |result| {
                        Event::StoragePermissionChecked { generation, result }
                    });
                }
            }
        }

        fn storage_permission_checked(model: &mut Model, caps: &Capabilities, result: PermissionResult) {
            match result {
                Ok(status) if status.is_granted() => Self::start_save(model, caps),
                Ok(status) => {
                    debug!(?status, "storage permission missing, requesting");
                    let generation = model.generation;
                    caps.permissions.request(Permission::StorageWrite, move |result| {
                        Event::StoragePermissionRequested { generation, result }
                    });
                }
                Err(e) => {
                    warn!(error = %e, "storage permission check failed");
                    Self::refuse_save(model, caps, AppError::from(e));
                }
            }
        }

        fn storage_permission_requested(
            model: &mut Model,
            caps: &Capabilities,
            result: PermissionResult,
        ) {
            match result {
                Ok(status) if status.is_granted() => Self::start_save(model, caps),
                Ok(status) => {
                    warn!(
                        ?status,
                        settings_prompt = status.should_show_settings_prompt(),
                        "storage permission refused"
                    );
                    let e = AppError::new(ErrorKind::PermissionDenied, "storage permission refused")
                        .with_context("status", format!("{status:?}"));
                    Self::refuse_save(model, caps, e);
                }
                Err(e) => {
                    warn!(error = %e, "storage permission request failed");
                    Self::refuse_save(model, caps, AppError::from(e));
                }
            }
        }

        fn refuse_save(model: &mut Model, caps: &Capabilities, error: AppError) {
            model.finish(OperationKind::Save);
            model.alert = Some(STORAGE_PERMISSION_MESSAGE.to_string());
            model.record_error(error);
            caps.render.render();
        }

        fn start_save(model: &mut Model, caps: &Capabilities) {
            let generation = model.generation;
            let Some(screen) = model.screen.as_mut() else {
                return;
            };

            let url = screen.media_item.presigned_get_url.clone();
            if url.is_empty() {
                error!("media has no download URL");
                screen.last_error = Some(AppError::new(
                    ErrorKind::Validation,
                    "media has no download URL",
                ));
                model.finish(OperationKind::Save);
                caps.render.render();
                return;
            }

            screen.is_busy = true;
            caps.media_library
                .save(url, move |result| Event::MediaSaved { generation, result });
            caps.render.render();
        }

        fn media_saved(model: &mut Model, caps: &Capabilities, result: MediaLibraryResult) {
            model.finish(OperationKind::Save);
            if let Some(screen) = model.screen.as_mut() {
                screen.is_busy = false;
            }

            match result {
                Ok(MediaLibraryOutput::Saved) => {
                    info!("media saved to device");
                    model.show_toast(SAVED_MESSAGE, ToastKind::Success);
                }
                Ok(other) => {
                    let e = AppError::from(crate::capabilities::MediaLibraryError::UnexpectedOutput {
                        output: format!("{other:?}"),
                    });
                    error!(error = %e, "save returned unexpected output");
                    model.record_error(e);
                }
                Err(e) => {
                    let e = AppError::from(e);
                    error!(error = %e, "failed to save media");
                    model.record_error(e);
                }
            }
            caps.render.render();
        }

        fn open_likes(model: &mut Model, caps: &Capabilities) {
            let Some(screen) = model.screen.as_ref() else {
                return;
            };

            let payload = ReactionsPayload {
                reactions: Some(likers_for_display(
                    &screen.media_item.likes,
                    screen.current_user.as_ref(),
                    screen.liked_by_current_user,
                )),
                hide_reaction_icon: false,
            };
            debug!(
                count = payload.reactions.as_ref().map_or(0, Vec::len),
                "opening likes"
            );

            model.reactions = Some(ReactionSet::from_payload(&payload));
            caps.navigation.push_reactions(payload);
            caps.render.render();
        }
    }

    impl crux_core::App for App {
        type Event = Event;
        type Model = Model;
        type ViewModel = ViewModel;
        type Capabilities = Capabilities;

        fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
            let event_name = event.name();
            if let Some(generation) = event.generation() {
                if generation != model.generation || model.screen.is_none() {
                    debug!(
                        event = event_name,
                        issued = generation.0,
                        current = model.generation.0,
                        "dropping completion for a screen that is gone"
                    );
                    return;
                }
            }
            if event.is_user_initiated() {
                debug!(event = event_name, "user action");
            }

            match event {
                Event::Configure(config) => {
                    match ApiEndpoints::new(&config.api_base_url) {
                        Ok(endpoints) => {
                            info!(base = endpoints.as_str(), platform = ?config.platform, "configured");
                            model.endpoints = Some(endpoints);
                        }
                        Err(e) => {
                            error!(error = %e, "invalid API configuration");
                            model.endpoints = None;
                        }
                    }
                    model.config = *config;
                }

                Event::ScreenOpened(route) => Self::open_screen(*route, model, caps),

                Event::ScreenClosed => Self::close_screen(model, caps),

                Event::CommentDraftChanged(text) => {
                    if let Some(screen) = model.screen.as_mut() {
                        screen.comment_draft = clamp_draft(text);
                        caps.render.render();
                    }
                }

                Event::SubmitComment => Self::submit_comment(model, caps),

                Event::ToggleFavorite { intended } => Self::toggle_favorite(model, caps, intended),

                Event::OpenLikes => Self::open_likes(model, caps),

                Event::ActionSheetToggled => {
                    if let Some(screen) = model.screen.as_mut() {
                        screen.action_sheet_open = !screen.action_sheet_open;
                        caps.render.render();
                    }
                }

                Event::PreviewToggled => {
                    if let Some(screen) = model.screen.as_mut() {
                        screen.preview_open = !screen.preview_open;
                        caps.render.render();
                    }
                }

                Event::SheetActionSelected(action) => {
                    let Some(screen) = model.screen.as_mut() else {
                        return;
                    };
                    screen.action_sheet_open = false;

                    let generation = model.generation;
                    caps.timer.start(model.config.action_delay_ms, move || {
                        Event::SheetActionDue { generation, action }
                    });
                    caps.render.render();
                }

                Event::SheetActionDue { action, .. } => match action {
                    SheetAction::Save => Self::save_to_device(model, caps),
                    SheetAction::Delete => Self::delete_media(model, caps),
                },

                Event::SaveToDevice => Self::save_to_device(model, caps),

                Event::DeleteMedia => Self::delete_media(model, caps),

                Event::ReactionsOpened(payload) => {
                    model.reactions = Some(ReactionSet::from_payload(&payload));
                    caps.render.render();
                }

                Event::ReactionsClosed => {
                    model.reactions = None;
                    caps.render.render();
                }

                Event::DismissToast => {
                    model.active_toast = None;
                    caps.render.render();
                }

                Event::DismissAlert => {
                    model.alert = None;
                    caps.render.render();
                }

                Event::CurrentUserLoaded { result, .. } => match result {
                    Ok(user) => {
                        if user.is_none() {
                            warn!("no signed-in user in session store");
                        }
                        if let Some(screen) = model.screen.as_mut() {
                            screen.current_user = user;
                        }
                        caps.render.render();
                    }
                    Err(e) => {
                        warn!(error = %e, "could not load signed-in user");
                        model.record_error(e);
                    }
                },

                Event::PlayableLocated { result, .. } => {
                    let Some(screen) = model.screen.as_mut() else {
                        return;
                    };
                    match result {
                        Ok(MediaLibraryOutput::Located { uri }) => {
                            debug!(%uri, "playable media located");
                            screen.playable_uri = Some(uri);
                            caps.render.render();
                        }
                        Ok(other) => warn!(?other, "unexpected locate output, streaming remote"),
                        Err(e) => warn!(error = %e, "could not locate media, streaming remote"),
                    }
                }

                Event::BusyTimerElapsed { busy, .. } => {
                    if let Some(screen) = model.screen.as_mut() {
                        screen.is_busy = busy;
                        caps.render.render();
                    }
                }

                Event::CommentAdded { result, .. } => Self::comment_added(model, caps, result),

                Event::MediaRefetched { result, .. } => Self::media_refetched(model, caps, *result),

                Event::FavoriteSet {
                    intended, result, ..
                } => Self::favorite_set(model, caps, intended, result),

                Event::MediaDeleted { result, .. } => Self::media_deleted(model, caps, result),

                Event::StoragePermissionChecked { result, .. } => {
                    Self::storage_permission_checked(model, caps, result);
                }

                Event::StoragePermissionRequested { result, .. } => {
                    Self::storage_permission_requested(model, caps, result);
                }

                Event::MediaSaved { result, .. } => Self::media_saved(model, caps, result),
            }
        }

        fn view(&self, model: &Model) -> ViewModel {
            ViewModel::build(model, now_ms())
        }
    }
}
