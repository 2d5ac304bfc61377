use crate::errors::ServiceError;
use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Parses a path identifier, answering 404 for anything that is not a UUID
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(raw).map_err(|_| ServiceError::NotFound(format!("{} {} not found", what, raw)))
}

/// JSON body extractor whose rejections use the service error envelope
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(map_json_rejection(rejection)),
        }
    }
}

fn map_json_rejection(rejection: JsonRejection) -> ServiceError {
    ServiceError::ValidationError(rejection.body_text())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_uuid_ids_are_not_found() {
        let err = parse_id("abc", "Item").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert!(parse_id(&Uuid::new_v4().to_string(), "Item").is_ok());
    }
}
