use std::sync::Arc;

use anyhow::{Context, anyhow, bail};
use chrono::Utc;
use log::info;
use reqwest::{
    Client, ClientBuilder, RequestBuilder,
    cookie::Jar,
    header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, HeaderMap, HeaderValue, ORIGIN, REFERER},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::config::{Credentials, PortalConfig};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const LOGIN_SUCCESS_CODE: &str = "SIGIN_SUCCESS";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded;charset=UTF-8";

#[derive(Debug, Serialize)]
struct ServiceParams<'a> {
    cli_time: String,
    orgtype: &'a str,
    servicename: &'a str,
    service_language: &'a str,
    serviceurl: String,
}

impl ServiceParams<'_> {
    fn new(config: &PortalConfig) -> Self {
        Self {
            cli_time: Utc::now().timestamp_millis().to_string(),
            orgtype: "40",
            servicename: "ZohoCreator",
            service_language: "en",
            serviceurl: config.service_url(),
        }
    }
}

#[derive(Debug, Serialize)]
struct LookupForm<'a> {
    mode: &'a str,
    #[serde(flatten)]
    service: ServiceParams<'a>,
}

#[derive(Debug, Serialize)]
struct PasswordQuery<'a> {
    digest: &'a str,
    #[serde(flatten)]
    service: ServiceParams<'a>,
}

#[derive(Debug, Serialize)]
struct PasswordBody<'a> {
    passwordauth: PasswordAuth<'a>,
}

#[derive(Debug, Serialize)]
struct PasswordAuth<'a> {
    password: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    lookup: LookupTokens,
}

#[derive(Debug, Default, Deserialize)]
struct LookupTokens {
    identifier: Option<String>,
    digest: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    passwordauth: Option<LoginStatus>,
}

#[derive(Debug, Deserialize)]
struct LoginStatus {
    code: Option<String>,
}

/// Tokens handed out by the lookup step and spent by the login step.
#[derive(Debug, Clone)]
struct SignInTokens {
    identifier: String,
    digest: String,
}

/// One user's authenticated conversation with the portal.
///
/// Owns its own cookie store, so concurrent sessions for different users never
/// share state. The protocol is strictly ordered: `lookup_user`, `login`, any
/// number of `fetch_page` calls, then `logout`.
pub struct PortalSession {
    client: Client,
    config: PortalConfig,
    tokens: Option<SignInTokens>,
}

impl PortalSession {
    pub fn new(config: PortalConfig) -> anyhow::Result<Self> {
        let jar = Arc::new(Jar::default());
        if let Some(token) = &config.csrf_token {
            let url = config
                .base_url()
                .parse::<reqwest::Url>()
                .with_context(|| format!("invalid portal base url {}", config.base_url()))?;
            jar.add_cookie_str(&format!("iamcsr={token}"), &url);
        }

        let client = ClientBuilder::new()
            .user_agent(USER_AGENT)
            .cookie_provider(jar)
            .build()?;

        Ok(Self {
            client,
            config,
            tokens: None,
        })
    }

    fn signin_headers(&self) -> anyhow::Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9,en-IN;q=0.8"),
        );
        headers.insert(ORIGIN, HeaderValue::from_str(self.config.base_url())?);
        headers.insert(REFERER, HeaderValue::from_str(&self.config.signin_referer())?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
        if let Some(token) = &self.config.csrf_token {
            headers.insert(
                "x-zcsrf-token",
                HeaderValue::from_str(&format!("iamcsrcoo={token}"))?,
            );
        }
        Ok(headers)
    }

    fn page_headers(&self) -> anyhow::Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9,en-IN;q=0.8"),
        );
        headers.insert(
            REFERER,
            HeaderValue::from_str(&format!("{}/", self.config.base_url()))?,
        );
        headers.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));
        Ok(headers)
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> anyhow::Result<T> {
        let response = request.send().await?.error_for_status()?;
        let body = response.json::<T>().await?;
        Ok(body)
    }

    /// Step 1: resolves the account and stores its identifier and digest.
    pub async fn lookup_user(&mut self, email: &str) -> anyhow::Result<()> {
        info!("Performing user lookup...");
        let form = LookupForm {
            mode: "primary",
            service: ServiceParams::new(&self.config),
        };
        let request = self
            .client
            .post(self.config.lookup_url(email))
            .headers(self.signin_headers()?)
            .form(&form);
        let response: LookupResponse = Self::send_json(request)
            .await
            .context("user lookup request failed")?;

        let (Some(identifier), Some(digest)) = (response.lookup.identifier, response.lookup.digest)
        else {
            bail!("user lookup did not return an identifier and digest");
        };
        self.tokens = Some(SignInTokens { identifier, digest });
        info!("Lookup successful");
        Ok(())
    }

    /// Step 2: signs in with the password, using the tokens from `lookup_user`.
    pub async fn login(&mut self, password: &str) -> anyhow::Result<()> {
        let tokens = self
            .tokens
            .clone()
            .ok_or_else(|| anyhow!("no identifier/digest found, run the user lookup first"))?;
        info!("Logging in...");

        let query = PasswordQuery {
            digest: &tokens.digest,
            service: ServiceParams::new(&self.config),
        };
        let body = serde_json::to_string(&PasswordBody {
            passwordauth: PasswordAuth { password },
        })?;
        let request = self
            .client
            .post(self.config.password_url(&tokens.identifier))
            .headers(self.signin_headers()?)
            .query(&query)
            .body(body);
        let response: LoginResponse = Self::send_json(request)
            .await
            .context("login request failed")?;

        let code = response.passwordauth.and_then(|status| status.code);
        if code.as_deref() != Some(LOGIN_SUCCESS_CODE) {
            bail!("login rejected by portal (code: {code:?})");
        }
        info!("Login successful");
        Ok(())
    }

    /// Runs both sign-in steps in order.
    pub async fn sign_in(&mut self, credentials: &Credentials) -> anyhow::Result<()> {
        self.lookup_user(&credentials.email).await?;
        self.login(&credentials.password).await
    }

    /// Fetches the raw body of an authenticated page.
    pub async fn fetch_page(&self, url: &str) -> anyhow::Result<String> {
        let response = self
            .client
            .get(url)
            .headers(self.page_headers()?)
            .send()
            .await?
            .error_for_status()
            .with_context(|| format!("failed to fetch {url}"))?;
        info!("Retrieved {} (status: {})", url, response.status());
        let body = response.text().await?;
        Ok(body)
    }

    /// The portal has no logout endpoint we call; dropping the session, with its
    /// cookie jar and sign-in tokens, is the whole logout.
    pub fn logout(self) {
        info!("Logged out of {}", self.config.base_url());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_login_requires_lookup_first() {
        let mut session = PortalSession::new(PortalConfig::new(None, None)).unwrap();
        let err = session.login("secret").await.unwrap_err();
        assert!(err.to_string().contains("lookup"));
    }

    #[test]
    fn test_lookup_response_without_tokens_deserializes() {
        let response: LookupResponse = serde_json::from_str(r#"{"errors":[]}"#).unwrap();
        assert!(response.lookup.identifier.is_none());
        assert!(response.lookup.digest.is_none());
    }

    #[test]
    fn test_password_body_shape() {
        let body = serde_json::to_value(PasswordBody {
            passwordauth: PasswordAuth { password: "hunter2" },
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"passwordauth": {"password": "hunter2"}}));
    }

    #[test]
    fn test_signin_headers_carry_csrf_token() {
        let config = PortalConfig::new(None, Some("391788bd".to_string()));
        let session = PortalSession::new(config).unwrap();
        let headers = session.signin_headers().unwrap();
        assert_eq!(headers["X-ZCSRF-TOKEN"], "iamcsrcoo=391788bd");
        assert_eq!(headers[ORIGIN], crate::config::DEFAULT_BASE_URL);
    }
}
