//! Sign-in and sign-up
//!
//! Both calls are unauthenticated. On success the returned token and user
//! become the stored session.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::http::{resolve_url, ApiResponse, ErrorBody};
use crate::identity::UserData;
use crate::manager::SessionManager;
use crate::Result;

pub const SIGN_IN_PATH: &str = "/auth/signin";
pub const SIGN_UP_PATH: &str = "/auth/signup";

#[derive(Debug, Clone, Serialize)]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Any further registration fields the backend accepts
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SignUpRequest {
    pub fn new(name: impl Into<String>, email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            extra: serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignInResponse {
    pub token: String,
    pub user: UserData,
    /// Set when this sign-in ended a session on another device
    #[serde(default, rename = "wasLoggedOutFromOtherDevice")]
    pub was_logged_out_from_other_device: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignUpResponse {
    pub token: String,
    pub user: UserData,
}

impl SessionManager {
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<SignInResponse> {
        let response = self
            .post_json(SIGN_IN_PATH, &SignInRequest { email, password })
            .await?;
        let signed_in: SignInResponse = response.json()?;

        if signed_in.was_logged_out_from_other_device {
            tracing::warn!(
                user_id = %signed_in.user.id,
                "Sign-in ended a session on another device"
            );
        }

        self.set_session(&signed_in.token, &signed_in.user, remember_me)?;
        Ok(signed_in)
    }

    pub async fn sign_up(
        &self,
        request: &SignUpRequest,
        remember_me: bool,
    ) -> Result<SignUpResponse> {
        let response = self.post_json(SIGN_UP_PATH, request).await?;
        let signed_up: SignUpResponse = response.json()?;

        tracing::info!(user_id = %signed_up.user.id, "Account created");

        self.set_session(&signed_up.token, &signed_up.user, remember_me)?;
        Ok(signed_up)
    }

    async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<ApiResponse> {
        let url = resolve_url(&self.config.api_base_url, path)?;

        let response = self.http.post(url).json(body).send().await?;
        let response = ApiResponse::read(response).await?;

        if !response.is_ok() {
            return Err(rejection(&response));
        }

        Ok(response)
    }
}

fn rejection(response: &ApiResponse) -> SessionError {
    let message = serde_json::from_slice::<ErrorBody>(&response.body)
        .ok()
        .and_then(|body| body.message)
        .or_else(|| {
            response
                .status
                .canonical_reason()
                .map(|reason| reason.to_string())
        })
        .unwrap_or_else(|| StatusCode::as_str(&response.status).to_string());

    SessionError::Rejected {
        status: response.status.as_u16(),
        message,
    }
}
