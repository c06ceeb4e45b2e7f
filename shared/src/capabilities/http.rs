use crux_http::{HttpError, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::event::Event;
use crate::model::{EventId, MediaId, MediaItem};
use crate::{AppError, ErrorKind};

pub const MAX_URL_LENGTH: usize = 2048;
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Base URL of the media API, validated once at configuration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    base: Url,
}

impl ApiEndpoints {
    pub fn new(base: &str) -> Result<Self, AppError> {
        let base = base.trim();
        if base.is_empty() {
            return Err(AppError::new(
                ErrorKind::Configuration,
                "API base URL is not configured",
            ));
        }
        if base.len() > MAX_URL_LENGTH {
            return Err(AppError::new(
                ErrorKind::Configuration,
                format!("API base URL exceeds maximum length of {MAX_URL_LENGTH} bytes"),
            ));
        }

        let parsed = Url::parse(base).map_err(|e| {
            AppError::new(ErrorKind::Configuration, "API base URL is invalid")
                .with_internal(e.to_string())
        })?;

        let scheme = parsed.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(AppError::new(
                ErrorKind::Configuration,
                format!("invalid scheme '{scheme}', only 'http' and 'https' are allowed"),
            ));
        }
        if parsed.host_str().is_none() {
            return Err(AppError::new(
                ErrorKind::Configuration,
                "API base URL must have a host",
            ));
        }
        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(AppError::new(
                ErrorKind::Configuration,
                "credentials in the API base URL are not allowed",
            ));
        }

        Ok(Self { base: parsed })
    }

    pub fn as_str(&self) -> &str {
        self.base.as_str()
    }

    /// `{base}/events/{event}/media/{media}`
    pub fn media(&self, event_id: &EventId, media_id: &MediaId) -> Result<String, AppError> {
        self.join(&["events", event_id.as_str(), "media", media_id.as_str()])
    }

    pub fn comments(&self, event_id: &EventId, media_id: &MediaId) -> Result<String, AppError> {
        self.join(&[
            "events",
            event_id.as_str(),
            "media",
            media_id.as_str(),
            "comments",
        ])
    }

    pub fn favorite(&self, event_id: &EventId, media_id: &MediaId) -> Result<String, AppError> {
        self.join(&[
            "events",
            event_id.as_str(),
            "media",
            media_id.as_str(),
            "favorite",
        ])
    }

    fn join(&self, segments: &[&str]) -> Result<String, AppError> {
        if segments.iter().any(|s| s.is_empty()) {
            return Err(AppError::new(
                ErrorKind::Validation,
                "cannot address media without event and media ids",
            )
            .with_context("segments", segments.join("/")));
        }

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| AppError::new(ErrorKind::Configuration, "API base URL cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddCommentRequest {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SetFavoriteRequest {
    pub is_favorited: bool,
}

/// Attaches the bearer token, when the shell configured one.
pub fn authorized(
    request: RequestBuilder<Event>,
    token: Option<&SecretString>,
) -> RequestBuilder<Event> {
    match token.map(ExposeSecret::expose_secret) {
        Some(token) if !token.is_empty() => {
            request.header("Authorization", format!("Bearer {token}"))
        }
        _ => request,
    }
}

pub fn decode_media(result: crux_http::Result<Response<MediaItem>>) -> Result<MediaItem, AppError> {
    let mut response = result.map_err(|e| AppError::from_http_error(&e))?;
    response.take_body().ok_or_else(|| {
        AppError::new(ErrorKind::Deserialization, "media response had no body")
    })
}

pub fn expect_success(result: crux_http::Result<Response<Vec<u8>>>) -> Result<(), AppError> {
    result.map(|_| ()).map_err(|e| AppError::from_http_error(&e))
}

impl AppError {
    pub fn from_http_error(error: &HttpError) -> Self {
        match error {
            HttpError::Http {
                code,
                message,
                body,
            } => Self::from_http_status(u16::from(*code), body.as_deref())
                .with_internal(message.clone()),
            HttpError::Timeout => Self::new(ErrorKind::Timeout, "request timed out"),
            HttpError::Json(message) => {
                Self::new(ErrorKind::Deserialization, "unexpected response format")
                    .with_internal(message.clone())
            }
            other => Self::new(ErrorKind::Network, "request failed").with_internal(other.to_string()),
        }
    }
}
