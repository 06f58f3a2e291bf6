use axum::extract::FromRequest;
use uuid::Uuid;

use crate::error::ApiError;

/// `axum::Json` with malformed bodies rejected as `400 {"error": ...}`
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Parse a path segment as a UUID, naming the resource in the error
pub fn parse_id(raw: &str, resource: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::bad_request(format!("Invalid {} id '{}'", resource, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_accepts_uuids() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string(), "feature").unwrap(), id);
    }

    #[test]
    fn parse_id_rejects_garbage_with_400() {
        let err = parse_id("not-a-uuid", "feature").unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.message(), "Invalid feature id 'not-a-uuid'");
    }
}
