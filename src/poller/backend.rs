//! Backend API verification probe.
//!
//! In backend mode the Self relayer posts the proof to the mini app's
//! `/api/verify-self` endpoint, which stores the result. The probe asks
//! `/api/verify-self/check` whether that has happened yet.

use crate::error::{Error, Result};
use crate::poller::{PollOptions, VerificationProbe, VerificationRequest, VerifiedIdentity};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Path of the verification check endpoint, relative to the site URL.
pub const CHECK_PATH: &str = "/api/verify-self/check";

/// Asks the mini app backend whether a user has been verified.
#[derive(Debug, Clone)]
pub struct BackendProbe {
    client: Client,
    check_url: Url,
}

#[derive(Debug, Serialize)]
struct CheckRequest<'a> {
    #[serde(rename = "userId")]
    user_id: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CheckResponse {
    verified: bool,
    date_of_birth: Option<String>,
    #[serde(rename = "userIdentifier")]
    user_identifier: Option<String>,
    name: Option<String>,
    nationality: Option<String>,
    timestamp: Option<u64>,
}

impl CheckResponse {
    fn into_identity(self) -> Option<VerifiedIdentity> {
        if !self.verified {
            return None;
        }
        Some(VerifiedIdentity {
            transaction_hash: None,
            date_of_birth: self.date_of_birth.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            nationality: self.nationality.unwrap_or_default(),
            timestamp: self.timestamp.unwrap_or(0),
            user_identifier: self.user_identifier,
        })
    }
}

impl BackendProbe {
    /// Create a probe for the mini app hosted at `site_url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(site_url: &str, request_timeout: Duration) -> Result<Self> {
        let base: Url = site_url
            .parse()
            .map_err(|e| Error::Config(format!("invalid site URL {site_url:?}: {e}")))?;
        let check_url = base
            .join(CHECK_PATH)
            .map_err(|e| Error::Config(format!("invalid site URL {site_url:?}: {e}")))?;

        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, check_url })
    }

    /// The endpoint polled by this probe.
    #[must_use]
    pub fn check_url(&self) -> &Url {
        &self.check_url
    }
}

#[async_trait]
impl VerificationProbe for BackendProbe {
    async fn probe(
        &self,
        request: &VerificationRequest,
        _options: &PollOptions,
    ) -> Result<Option<VerifiedIdentity>> {
        let user_id = request.user_address.to_string();

        let response = self
            .client
            .post(self.check_url.clone())
            .json(&CheckRequest { user_id: &user_id })
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| Error::Backend(format!("verification check failed: {e}")))?;

        let body: CheckResponse = response
            .json()
            .await
            .map_err(|e| Error::Backend(format!("invalid check response: {e}")))?;

        debug!(user = %user_id, verified = body.verified, "Backend verification check");
        Ok(body.into_identity())
    }
}
