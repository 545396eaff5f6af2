use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

/// Response of the token endpoint
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

/// Confirmation-code OAuth flow for obtaining a Disk access token
pub struct OAuthFlow {
    client: Client,
    oauth_base: String,
    client_id: String,
    client_secret: String,
}

impl OAuthFlow {
    pub fn new(oauth_base: &str, client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            oauth_base: oauth_base.trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// URL the user opens to obtain a confirmation code
    pub fn authorize_url(&self) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/authorize", self.oauth_base))
            .context("Invalid OAuth base URL")?;

        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id);

        Ok(url)
    }

    /// Exchange a confirmation code for an access token
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        let response = self
            .client
            .post(format!("{}/token", self.oauth_base))
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code.trim()),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .context("Failed to reach the OAuth server")?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response
                .json::<OAuthErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error_description.or(body.error))
                .unwrap_or_else(|| status.to_string());
            anyhow::bail!("Token exchange rejected (HTTP {}): {}", status, detail);
        }

        response
            .json::<TokenResponse>()
            .await
            .context("Failed to parse token response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_url() {
        let flow = OAuthFlow::new("https://oauth.yandex.ru/", "my-app", "secret");
        let url = flow.authorize_url().unwrap();

        assert_eq!(url.host_str(), Some("oauth.yandex.ru"));
        assert_eq!(url.path(), "/authorize");
        assert_eq!(url.query(), Some("response_type=code&client_id=my-app"));
    }
}
