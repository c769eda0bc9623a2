//! Request options, buffered responses and error-body classification

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::error::SessionError;
use crate::Result;

pub const SESSION_INVALID_CODE: &str = "SESSION_INVALID";
pub const USER_BANNED_CODE: &str = "USER_BANNED";

/// Caller-controlled parts of an authenticated request.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| SessionError::InvalidHeader(name.to_string()))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| SessionError::InvalidHeader(name.as_str().to_string()))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn json(mut self, body: &serde_json::Value) -> Self {
        self.body = Some(body.to_string().into_bytes());
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::get()
    }
}

/// A fully read response. Returned to callers exactly as received.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub(crate) async fn read(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        Ok(Self {
            status,
            headers,
            body,
        })
    }

    /// 2xx status
    pub fn is_ok(&self) -> bool {
        self.status.is_success()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// What a response means for the session.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Verdict {
    Normal,
    SessionInvalid(Option<String>),
    UserBanned(Option<String>),
}

/// Only 401/403 bodies are inspected. A body that is not JSON, or carries
/// any other code, is a normal response.
pub(crate) fn classify(response: &ApiResponse) -> Verdict {
    if !matches!(
        response.status,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
    ) {
        return Verdict::Normal;
    }

    let body: ErrorBody = match serde_json::from_slice(&response.body) {
        Ok(body) => body,
        Err(_) => return Verdict::Normal,
    };

    match body.code.as_deref() {
        Some(SESSION_INVALID_CODE) => Verdict::SessionInvalid(body.message),
        Some(USER_BANNED_CODE) => Verdict::UserBanned(body.message),
        _ => Verdict::Normal,
    }
}

/// Bearer auth plus JSON content type, overridden by caller headers.
pub(crate) fn merge_headers(token: &str, caller: &HeaderMap) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let bearer = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|_| SessionError::InvalidHeader(AUTHORIZATION.as_str().to_string()))?;
    headers.insert(AUTHORIZATION, bearer);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    for name in caller.keys() {
        headers.remove(name);
        for value in caller.get_all(name) {
            headers.append(name.clone(), value.clone());
        }
    }

    Ok(headers)
}

/// Absolute URLs pass through; anything else is a path under `base`.
pub(crate) fn resolve_url(base: &Url, target: &str) -> Result<Url> {
    if let Ok(url) = Url::parse(target) {
        return Ok(url);
    }

    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        target.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|_| SessionError::InvalidUrl(target.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(status: u16, body: &str) -> ApiResponse {
        ApiResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_classify_distinguished_codes() {
        let invalid = response(401, r#"{"code":"SESSION_INVALID","message":"m"}"#);
        assert_eq!(
            classify(&invalid),
            Verdict::SessionInvalid(Some("m".to_string()))
        );

        let banned = response(403, r#"{"code":"USER_BANNED"}"#);
        assert_eq!(classify(&banned), Verdict::UserBanned(None));
    }

    #[test]
    fn test_classify_everything_else_is_normal() {
        assert_eq!(
            classify(&response(401, r#"{"code":"SOMETHING_ELSE"}"#)),
            Verdict::Normal
        );
        assert_eq!(classify(&response(403, "<html>nope</html>")), Verdict::Normal);
        assert_eq!(classify(&response(401, "")), Verdict::Normal);
        assert_eq!(classify(&response(401, "[1,2]")), Verdict::Normal);
        // Only 401/403 are inspected
        assert_eq!(
            classify(&response(500, r#"{"code":"SESSION_INVALID"}"#)),
            Verdict::Normal
        );
    }

    #[test]
    fn test_caller_headers_override_defaults() {
        let options = RequestOptions::post()
            .header("Content-Type", "text/plain")
            .unwrap()
            .header("X-Request-Id", "abc")
            .unwrap();

        let headers = merge_headers("tok", &options.headers).unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer tok");
        assert_eq!(headers[CONTENT_TYPE], "text/plain");
        assert_eq!(headers["x-request-id"], "abc");
    }

    #[test]
    fn test_caller_can_replace_authorization() {
        let options = RequestOptions::get()
            .header("Authorization", "Bearer other")
            .unwrap();
        let headers = merge_headers("tok", &options.headers).unwrap();
        assert_eq!(headers.get_all(AUTHORIZATION).iter().count(), 1);
        assert_eq!(headers[AUTHORIZATION], "Bearer other");
    }

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("http://localhost:5000/api").unwrap();
        assert_eq!(
            resolve_url(&base, "/auth/validate").unwrap().as_str(),
            "http://localhost:5000/api/auth/validate"
        );
        assert_eq!(
            resolve_url(&base, "courses?page=2").unwrap().as_str(),
            "http://localhost:5000/api/courses?page=2"
        );
        assert_eq!(
            resolve_url(&base, "https://cdn.example.com/x").unwrap().as_str(),
            "https://cdn.example.com/x"
        );
    }

    #[test]
    fn test_response_helpers() {
        let ok = response(200, r#"{"valid":true}"#);
        assert!(ok.is_ok());
        let value: serde_json::Value = ok.json().unwrap();
        assert_eq!(value, json!({"valid": true}));
        assert_eq!(response(404, "missing").text(), "missing");
    }
}
