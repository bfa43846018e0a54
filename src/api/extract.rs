//! Extractors whose rejections are rendered through [`AppError`], so a
//! malformed path, JSON body or multipart request still answers with the
//! `{ success: false, message }` envelope.

use crate::api::error::AppError;
use axum::{
    Json, async_trait,
    extract::{
        FromRequest, FromRequestParts, Multipart, Path, Request,
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection},
    },
    http::request::Parts,
};
use serde::de::DeserializeOwned;

pub struct ApiPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ApiPath(value)),
            Err(rejection) => Err(path_rejection(rejection)),
        }
    }
}

pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

pub struct ApiMultipart(pub Multipart);

#[async_trait]
impl<S> FromRequest<S> for ApiMultipart
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Multipart::from_request(req, state).await {
            Ok(multipart) => Ok(ApiMultipart(multipart)),
            Err(rejection) => Err(multipart_rejection(rejection)),
        }
    }
}

fn path_rejection(rejection: PathRejection) -> AppError {
    tracing::debug!("Rejected path: {}", rejection.body_text());
    AppError::BadRequest(rejection.body_text())
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    tracing::debug!("Rejected JSON body: {}", rejection.body_text());
    AppError::BadRequest(rejection.body_text())
}

fn multipart_rejection(rejection: MultipartRejection) -> AppError {
    tracing::debug!("Rejected multipart body: {}", rejection.body_text());
    AppError::BadRequest(rejection.body_text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::response::IntoResponse;
    use http_body_util::BodyExt;
    use serde_json::Value;

    async fn body_json(err: AppError) -> (axum::http::StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_json_rejection_is_enveloped() {
        let req = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let Err(err) = ApiJson::<Value>::from_request(req, &()).await else {
            panic!("malformed JSON was accepted");
        };
        let (status, body) = body_json(err).await;
        assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_multipart_without_boundary_is_enveloped() {
        let req = Request::builder()
            .method("POST")
            .header("content-type", "text/plain")
            .body(Body::from("hello"))
            .unwrap();

        let Err(err) = ApiMultipart::from_request(req, &()).await else {
            panic!("plain text was accepted as multipart");
        };
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
