//! Request extractors

use super::error::ApiError;
use super::AppState;
use crate::application::ServiceError;
use crate::infrastructure::TokenError;
use axum::extract::rejection::PathRejection;
use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;

pub const MSG_BAD_AUTH_HEADER: &str =
    "Bad Authorization header. Expected 'Authorization: Bearer <JWT>'";

pub const MSG_RESOURCE_NOT_FOUND: &str = "Recurso não encontrado";

/// `Json` whose rejection renders as a 400 `{"msg"}` body
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}

/// `Path` whose rejection renders as a `{"msg"}` body
///
/// A segment that does not parse as `T` (`/classes/abc`, an id past
/// `i32::MAX`) names no resource and gets a 404.
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ApiPath(value)),
            Err(PathRejection::FailedToDeserializePathParams(_)) => {
                Err(ServiceError::not_found(MSG_RESOURCE_NOT_FOUND).into())
            }
            Err(rejection) => Err(ServiceError::Internal(rejection.body_text()).into()),
        }
    }
}

/// Identity taken from a valid bearer token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i32,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(TokenError::Missing)?
            .to_str()
            .map_err(|_| TokenError::Invalid(MSG_BAD_AUTH_HEADER.to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| TokenError::Invalid(MSG_BAD_AUTH_HEADER.to_string()))?;

        let claims = state.auth.authenticate(token)?;
        Ok(CurrentUser {
            id: claims.user_id()?,
        })
    }
}
