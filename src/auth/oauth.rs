//! OAuth authorization-code flow for GitHub and Google.

use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

use crate::auth::session::UserProfile;
use crate::core::config::{AuthConfig, OAuthClientConfig};
use crate::core::errors::{HubError, HubResult};
use crate::core::provider::Provider;
use crate::sources::github::GithubClient;

const SERVICE: &str = "OAuth";

/// Scopes requested from each provider.
#[must_use]
pub const fn scopes(provider: Provider) -> &'static str {
    match provider {
        Provider::Github => "repo",
        Provider::Google => "openid profile email https://www.googleapis.com/auth/drive.readonly",
    }
}

/// Access token obtained from a code exchange.
#[derive(Clone, Debug)]
pub struct TokenGrant {
    /// Provider access token.
    pub access_token: String,
    /// Lifetime in seconds, when the provider reports one.
    pub expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

/// Builds authorize URLs, exchanges codes and loads user profiles.
pub struct OAuthClient {
    http: reqwest::Client,
    config: AuthConfig,
    public_url: String,
}

impl OAuthClient {
    /// Create the client.
    #[must_use]
    pub fn new(http: reqwest::Client, config: AuthConfig, public_url: &str) -> Self {
        Self {
            http,
            config,
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    fn credentials(&self, provider: Provider) -> HubResult<&OAuthClientConfig> {
        let client = match provider {
            Provider::Github => self.config.github.as_ref(),
            Provider::Google => self.config.google.as_ref(),
        };
        client.ok_or_else(|| {
            HubError::NotFound(format!("{} sign-in is not configured", provider.display_name()))
        })
    }

    /// Whether a provider has OAuth credentials.
    #[must_use]
    pub fn is_configured(&self, provider: Provider) -> bool {
        self.credentials(provider).is_ok()
    }

    /// Callback URL registered with the provider.
    #[must_use]
    pub fn redirect_uri(&self, provider: Provider) -> String {
        format!("{}/api/auth/{provider}/callback", self.public_url)
    }

    /// Provider authorize URL for a login `state`.
    ///
    /// # Errors
    /// Returns [`HubError::NotFound`] if the provider is not configured.
    pub fn authorize_url(&self, provider: Provider, state: &str) -> HubResult<String> {
        let credentials = self.credentials(provider)?;
        let base = match provider {
            Provider::Github => &self.config.endpoints.github_authorize_url,
            Provider::Google => &self.config.endpoints.google_authorize_url,
        };

        let mut url = Url::parse(base)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &credentials.client_id)
                .append_pair("redirect_uri", &self.redirect_uri(provider))
                .append_pair("scope", scopes(provider))
                .append_pair("state", state);
            if provider == Provider::Google {
                query
                    .append_pair("response_type", "code")
                    .append_pair("access_type", "online")
                    .append_pair("prompt", "consent");
            }
        }
        Ok(url.into())
    }

    /// Exchange an authorization code for an access token.
    ///
    /// # Errors
    /// Returns [`HubError::Unauthorized`] if the provider rejects the code,
    /// or [`HubError::Upstream`] on an unexpected status.
    pub async fn exchange_code(&self, provider: Provider, code: &str) -> HubResult<TokenGrant> {
        let credentials = self.credentials(provider)?;
        let redirect_uri = self.redirect_uri(provider);
        let mut form = vec![
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", redirect_uri.as_str()),
        ];
        let token_url = match provider {
            Provider::Github => &self.config.endpoints.github_token_url,
            Provider::Google => {
                form.push(("grant_type", "authorization_code"));
                &self.config.endpoints.google_token_url
            }
        };

        let response = self
            .http
            .post(token_url)
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status.is_server_error() {
            return Err(HubError::Upstream {
                service: SERVICE,
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: TokenResponse = serde_json::from_str(&body)?;
        match parsed.access_token.filter(|t| !t.is_empty()) {
            Some(access_token) if status.is_success() => {
                info!(provider = %provider, "Exchanged authorization code");
                Ok(TokenGrant {
                    access_token,
                    expires_in: parsed.expires_in,
                })
            }
            _ => {
                let reason = parsed
                    .error_description
                    .or(parsed.error)
                    .unwrap_or_else(|| format!("token endpoint returned {status}"));
                warn!(provider = %provider, %reason, "Code exchange rejected");
                Err(HubError::Unauthorized(reason))
            }
        }
    }

    /// Load the signed-in user's profile.
    ///
    /// # Errors
    /// Returns an error if the provider rejects the token.
    pub async fn fetch_profile(
        &self,
        provider: Provider,
        github: &GithubClient,
        access_token: &str,
    ) -> HubResult<UserProfile> {
        match provider {
            Provider::Github => {
                let user = github.authenticated_user(access_token).await?;
                Ok(UserProfile {
                    id: user.id.to_string(),
                    name: user.name.filter(|n| !n.is_empty()).unwrap_or(user.login),
                    email: user.email,
                    avatar_url: user.avatar_url,
                })
            }
            Provider::Google => {
                let response = self
                    .http
                    .get(&self.config.endpoints.google_userinfo_url)
                    .bearer_auth(access_token)
                    .send()
                    .await?;
                let status = response.status();
                if status == reqwest::StatusCode::UNAUTHORIZED {
                    return Err(HubError::Unauthorized(
                        "Google rejected the access token".to_string(),
                    ));
                }
                if !status.is_success() {
                    return Err(HubError::Upstream {
                        service: "Google userinfo",
                        status: status.as_u16(),
                        message: response.text().await.unwrap_or_default(),
                    });
                }
                let info: GoogleUserInfo = response.json().await?;
                let name = info
                    .name
                    .clone()
                    .filter(|n| !n.is_empty())
                    .or_else(|| info.email.clone())
                    .unwrap_or_else(|| info.sub.clone());
                Ok(UserProfile {
                    id: info.sub,
                    name,
                    email: info.email,
                    avatar_url: info.picture,
                })
            }
        }
    }
}
