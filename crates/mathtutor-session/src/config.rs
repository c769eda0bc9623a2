//! Session manager settings

use std::time::Duration;
use url::Url;

use crate::error::SessionError;
use crate::Result;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_SIGN_IN_PATH: &str = "/sign-in";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base for relative request paths
    pub api_base_url: Url,
    /// Where forced redirects land
    pub sign_in_path: String,
    pub invalidation_redirect_delay: Duration,
    pub ban_redirect_delay: Duration,
    pub invalidation_toast_duration: Duration,
    pub ban_toast_duration: Duration,
}

impl SessionConfig {
    pub fn new(api_base_url: &str) -> Result<Self> {
        let api_base_url = Url::parse(api_base_url)
            .map_err(|e| SessionError::InvalidUrl(format!("{}: {}", api_base_url, e)))?;

        Ok(Self::with_base_url(api_base_url))
    }

    pub fn with_base_url(api_base_url: Url) -> Self {
        Self {
            api_base_url,
            sign_in_path: DEFAULT_SIGN_IN_PATH.to_string(),
            invalidation_redirect_delay: Duration::from_secs(2),
            ban_redirect_delay: Duration::from_secs(3),
            invalidation_toast_duration: Duration::from_secs(5),
            ban_toast_duration: Duration::from_secs(8),
        }
    }
}
