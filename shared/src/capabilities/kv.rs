use std::fmt::Display;

use crate::model::UserRef;
use crate::{AppError, ErrorKind};

/// Key the login flow writes the signed-in user's profile under.
pub const SESSION_USER_KEY: &str = "userDetails";
pub const MAX_SESSION_VALUE_SIZE: usize = 64 * 1024;

/// Turns the raw session-store read into the signed-in user, if any.
pub fn decode_session_user<E: Display>(
    result: Result<Option<Vec<u8>>, E>,
) -> Result<Option<UserRef>, AppError> {
    let bytes = match result {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return Ok(None),
        Err(e) => {
            return Err(AppError::new(ErrorKind::Storage, "could not read the session")
                .with_internal(e.to_string()))
        }
    };

    if bytes.is_empty() {
        return Ok(None);
    }
    if bytes.len() > MAX_SESSION_VALUE_SIZE {
        return Err(AppError::new(
            ErrorKind::Storage,
            format!(
                "session value too large ({} > {MAX_SESSION_VALUE_SIZE} bytes)",
                bytes.len()
            ),
        ));
    }

    let user: UserRef = serde_json::from_slice(&bytes).map_err(|e| {
        AppError::new(ErrorKind::Deserialization, "stored session is malformed")
            .with_internal(e.to_string())
            .with_context("key", SESSION_USER_KEY)
    })?;

    if user.key().is_none() {
        return Err(AppError::new(
            ErrorKind::Deserialization,
            "stored session user has no id",
        ));
    }
    Ok(Some(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UserId;

    type Read = Result<Option<Vec<u8>>, String>;

    #[test]
    fn decodes_stored_user() {
        let bytes = serde_json::to_vec(&serde_json::json!({
            "_id": "u1",
            "first_name": "Ada",
            "last_name": "Lovelace"
        }))
        .unwrap();

        let user = decode_session_user(Read::Ok(Some(bytes))).unwrap().unwrap();
        assert_eq!(user.id, UserId::new("u1"));
    }

    #[test]
    fn missing_value_is_no_user() {
        assert_eq!(decode_session_user(Read::Ok(None)).unwrap(), None);
        assert_eq!(decode_session_user(Read::Ok(Some(Vec::new()))).unwrap(), None);
    }

    #[test]
    fn store_failure_is_a_storage_error() {
        let err = decode_session_user(Read::Err("disk full".into())).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Storage);
        assert_eq!(err.internal_message.as_deref(), Some("disk full"));
    }

    #[test]
    fn garbage_is_a_deserialization_error() {
        let err = decode_session_user(Read::Ok(Some(b"{not json".to_vec()))).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Deserialization);
    }

    #[test]
    fn user_without_id_is_rejected() {
        let bytes = br#"{"first_name":"Nobody"}"#.to_vec();
        assert!(decode_session_user(Read::Ok(Some(bytes))).is_err());
    }
}
