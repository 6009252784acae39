//! OAuth2 authorization-code client for the configured identity provider.

use reqwest::Url;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use threadpaste_core::models::user::ProviderIdentity;
use threadpaste_core::OAuthConfig;

const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Failures talking to the identity provider.
#[derive(Error, Debug)]
pub enum OAuthError {
    #[error("OAuth client id is not configured")]
    NotConfigured,

    #[error("Invalid provider URL: {0}")]
    InvalidUrl(String),

    #[error("Provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed provider response: {0}")]
    Malformed(String),
}

/// Thin client over the provider's authorize, token and profile endpoints.
pub struct OAuthClient {
    http: reqwest::Client,
    config: OAuthConfig,
}

/// Render a JSON scalar (string or number) as a string.
fn json_scalar(value: &Value, field: &str) -> Option<String> {
    match value.get(field)? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

impl OAuthClient {
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Whether a client id has been configured.
    pub fn is_configured(&self) -> bool {
        !self.config.client_id.is_empty()
    }

    /// Build the provider URL the browser is sent to.
    ///
    /// # Arguments
    /// - `redirect_uri`: Absolute callback URL.
    /// - `state`: Opaque anti-forgery value echoed back by the provider.
    ///
    /// # Errors
    /// [`OAuthError::NotConfigured`] without a client id,
    /// [`OAuthError::InvalidUrl`] when the authorize URL does not parse.
    pub fn authorize_url(&self, redirect_uri: &str, state: &str) -> Result<String, OAuthError> {
        if !self.is_configured() {
            return Err(OAuthError::NotConfigured);
        }
        let url = Url::parse_with_params(
            &self.config.authorize_url,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("state", state),
            ],
        )
        .map_err(|err| OAuthError::InvalidUrl(format!("{}: {}", self.config.authorize_url, err)))?;
        Ok(url.to_string())
    }

    /// Exchange an authorization code and look up the signed-in profile.
    ///
    /// # Errors
    /// Returns an error on transport failures, non-success statuses, or
    /// responses missing the token, id, or name fields.
    pub async fn fetch_identity(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<ProviderIdentity, OAuthError> {
        if !self.is_configured() {
            return Err(OAuthError::NotConfigured);
        }

        // Some providers answer with a JSON body but a text/plain content type.
        let token_body = self
            .http
            .post(&self.config.token_url)
            .timeout(PROVIDER_TIMEOUT)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let token: Value = serde_json::from_str(&token_body)
            .map_err(|err| OAuthError::Malformed(format!("token response: {}", err)))?;
        let access_token = json_scalar(&token, "access_token")
            .ok_or_else(|| OAuthError::Malformed("missing access_token".to_string()))?;

        let mut query = vec![
            ("source", self.config.client_id.clone()),
            ("access_token", access_token.clone()),
        ];
        if let Some(uid) = json_scalar(&token, "uid") {
            query.push(("uid", uid));
        }

        let profile: Value = self
            .http
            .get(&self.config.profile_url)
            .timeout(PROVIDER_TIMEOUT)
            .query(&query)
            .bearer_auth(&access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let provider_id = json_scalar(&profile, &self.config.id_field).ok_or_else(|| {
            OAuthError::Malformed(format!("profile missing '{}'", self.config.id_field))
        })?;
        let display_name = json_scalar(&profile, &self.config.name_field).ok_or_else(|| {
            OAuthError::Malformed(format!("profile missing '{}'", self.config.name_field))
        })?;

        Ok(ProviderIdentity {
            provider_id,
            display_name,
        })
    }
}
