use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::core::config::AuthSettings;
use crate::db::types::UserRole;

#[derive(Debug, Error)]
pub(crate) enum GoogleAuthError {
    #[error("tokeninfo request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Google rejected the token")]
    InvalidToken,
    #[error("token was issued for a different application")]
    AudienceMismatch,
    #[error("email {0} is not verified")]
    UnverifiedEmail(String),
    #[error("email domain is not allowed")]
    DomainNotAllowed,
}

/// Profile extracted from a verified Google ID token.
#[derive(Debug, Clone)]
pub(crate) struct GoogleProfile {
    pub(crate) google_uid: String,
    pub(crate) email: String,
    pub(crate) full_name: String,
    pub(crate) avatar_url: Option<String>,
    pub(crate) role: UserRole,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    sub: String,
    email: String,
    #[serde(default)]
    email_verified: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
    #[serde(default)]
    aud: Option<String>,
}

/// Verifies Google ID tokens against the tokeninfo endpoint and maps the
/// holder's mail domain to an application role.
#[derive(Debug, Clone)]
pub(crate) struct GoogleAuthService {
    client: reqwest::Client,
    tokeninfo_url: String,
    client_id: String,
    professor_domain: String,
    student_domain: String,
}

impl GoogleAuthService {
    pub(crate) fn new(auth: &AuthSettings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            tokeninfo_url: auth.tokeninfo_url.clone(),
            client_id: auth.google_client_id.clone(),
            professor_domain: auth.professor_domain.clone(),
            student_domain: auth.student_domain.clone(),
        }
    }

    /// Verifies the ID token remotely and returns the caller's profile.
    pub(crate) async fn verify(&self, id_token: &str) -> Result<GoogleProfile, GoogleAuthError> {
        let response = self
            .client
            .get(&self.tokeninfo_url)
            .query(&[("id_token", id_token)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(GoogleAuthError::InvalidToken);
        }
        let info: TokenInfo = response.json().await.map_err(|_| GoogleAuthError::InvalidToken)?;

        if let Some(aud) = info.aud.as_deref() {
            if !self.client_id.is_empty() && aud != self.client_id {
                return Err(GoogleAuthError::AudienceMismatch);
            }
        }
        if info.email_verified.as_deref() != Some("true") {
            return Err(GoogleAuthError::UnverifiedEmail(info.email));
        }

        let role = self.resolve_role(&info.email)?;
        let full_name =
            info.name.filter(|n| !n.trim().is_empty()).unwrap_or_else(|| info.email.clone());

        Ok(GoogleProfile {
            google_uid: info.sub,
            email: info.email,
            full_name,
            avatar_url: info.picture,
            role,
        })
    }

    /// Maps an email address to a role by its domain. The student domain is
    /// checked first because it is a subdomain of the professor domain, so
    /// a suffix match against the professor domain would also catch
    /// student addresses.
    pub(crate) fn resolve_role(&self, email: &str) -> Result<UserRole, GoogleAuthError> {
        let domain = email
            .rsplit_once('@')
            .map(|(_, d)| d.to_ascii_lowercase())
            .ok_or(GoogleAuthError::DomainNotAllowed)?;
        if domain == self.student_domain.to_ascii_lowercase() {
            Ok(UserRole::Student)
        } else if domain == self.professor_domain.to_ascii_lowercase() {
            Ok(UserRole::Professor)
        } else {
            Err(GoogleAuthError::DomainNotAllowed)
        }
    }
}
