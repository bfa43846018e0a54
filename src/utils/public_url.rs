use crate::AppState;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use std::convert::Infallible;

/// URL prefix of uploaded resumes, served from the public directory
pub const PROFILE_RESUME_BASE_URL: &str = "file/cv/profile";
/// URL prefix of scanned license and certificate files
pub const LICENSE_CERTIFICATE_BASE_URL: &str = "file/cv/license_certificate";

/// Scheme and authority clients use to reach this server, e.g.
/// `https://cv.example.com`.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOrigin(pub String);

impl RequestOrigin {
    /// `${origin}/${base_url}/${filename}`
    pub fn file_url(&self, base_url: &str, filename: &str) -> String {
        format!(
            "{}/{}/{}",
            self.0.trim_end_matches('/'),
            base_url.trim_matches('/'),
            filename
        )
    }

    /// Rewrites a stored filename in place; empty or absent values are kept.
    pub fn expand(&self, base_url: &str, filename: &mut Option<String>) {
        let url = filename
            .as_deref()
            .filter(|n| !n.is_empty())
            .map(|n| self.file_url(base_url, n));
        if url.is_some() {
            *filename = url;
        }
    }

    fn from_headers(parts: &Parts) -> Self {
        let header_str = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.split(',').next().unwrap_or("").trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let scheme = header_str("x-forwarded-proto").unwrap_or_else(|| "http".to_string());
        let host = header_str("x-forwarded-host")
            .or_else(|| header_str(header::HOST.as_str()))
            .or_else(|| parts.uri.authority().map(|a| a.to_string()))
            .unwrap_or_else(|| "localhost".to_string());

        RequestOrigin(format!("{}://{}", scheme, host))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for RequestOrigin {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(origin) = &state.config.public_origin {
            return Ok(RequestOrigin(origin.clone()));
        }
        Ok(Self::from_headers(parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_file_url() {
        let origin = RequestOrigin("http://localhost:3000/".to_string());
        assert_eq!(
            origin.file_url("images/cv/experience", "abc.png"),
            "http://localhost:3000/images/cv/experience/abc.png"
        );
    }

    #[test]
    fn test_expand_skips_empty() {
        let origin = RequestOrigin("http://h".to_string());

        let mut some = Some("a.jpg".to_string());
        origin.expand("images/cv/education", &mut some);
        assert_eq!(some.as_deref(), Some("http://h/images/cv/education/a.jpg"));

        let mut empty = Some(String::new());
        origin.expand("images/cv/education", &mut empty);
        assert_eq!(empty.as_deref(), Some(""));

        let mut none = None;
        origin.expand("images/cv/education", &mut none);
        assert_eq!(none, None);
    }

    #[test]
    fn test_origin_from_headers() {
        let p = parts(Request::builder().uri("/x").header("host", "cv.local:8080"));
        assert_eq!(RequestOrigin::from_headers(&p).0, "http://cv.local:8080");

        let p = parts(
            Request::builder()
                .uri("/x")
                .header("host", "internal:3000")
                .header("x-forwarded-proto", "https")
                .header("x-forwarded-host", "cv.example.com"),
        );
        assert_eq!(RequestOrigin::from_headers(&p).0, "https://cv.example.com");
    }
}
