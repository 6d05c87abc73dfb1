// API client module: a blocking HTTP session against the vendor API.
// `Session::authenticate` trades username/password for a bearer token and
// keeps a client that sends it on every request. The upload pipeline lives
// in `upload.rs` and reuses the session defined here.

use crate::config::Endpoints;
use crate::error::{read_body, ApiError, AuthError};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Authenticated capability for one program run. Holds two clients: `api`
/// carries the bearer token, `transfer` talks to the third-party object
/// store and must never see it.
#[derive(Clone)]
pub struct Session {
    api: Client,
    pub(crate) transfer: Client,
    endpoints: Endpoints,
}

/// Password grant form sent to the token endpoint.
#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// One element of the household and creative-tonie collections.
#[derive(Deserialize, Debug)]
struct Named {
    id: String,
    name: String,
}

/// One playable entry on a figurine.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub title: String,
    pub file: String,
}

#[derive(Serialize)]
struct ChapterUpdate<'a> {
    chapters: &'a [Chapter],
}

impl Session {
    /// Request a token with the resource-owner password grant and build a
    /// client that attaches it. There is no refresh: the token has to
    /// outlive the run.
    pub fn authenticate(
        endpoints: &Endpoints,
        username: &str,
        password: &str,
    ) -> Result<Self, AuthError> {
        let transfer = Client::builder().build().map_err(AuthError::Client)?;

        let form = TokenRequest {
            grant_type: "password",
            client_id: &endpoints.client_id,
            username,
            password,
        };
        debug!(url = %endpoints.token_url, "requesting token");
        let res = transfer
            .post(&endpoints.token_url)
            .form(&form)
            .send()
            .map_err(AuthError::Transport)?;
        if !res.status().is_success() {
            let status = res.status();
            return Err(AuthError::Rejected {
                status,
                body: read_body(res),
            });
        }
        let token: TokenResponse = res.json().map_err(AuthError::Decode)?;

        let mut headers = HeaderMap::new();
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.access_token))
            .map_err(|_| AuthError::InvalidToken)?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);

        let api = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(AuthError::Client)?;

        Ok(Session {
            api,
            transfer,
            endpoints: endpoints.clone(),
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub(crate) fn api(&self) -> &Client {
        &self.api
    }

    /// Households of the account, keyed by display name.
    pub fn list_households(&self) -> Result<HashMap<String, String>, ApiError> {
        self.list_named("requesting households", &self.endpoints.api("/households"))
    }

    /// Creative tonies of a household, keyed by display name.
    pub fn list_figurines(&self, household_id: &str) -> Result<HashMap<String, String>, ApiError> {
        let path = format!("/households/{household_id}/creativetonies");
        self.list_named("requesting tonies", &self.endpoints.api(&path))
    }

    fn list_named(
        &self,
        action: &'static str,
        url: &str,
    ) -> Result<HashMap<String, String>, ApiError> {
        debug!(%url, "{action}");
        let res = self
            .api
            .get(url)
            .send()
            .map_err(|source| ApiError::Transport { action, source })?;
        let res = check_status(action, res)?;
        let items: Vec<Named> = res
            .json()
            .map_err(|source| ApiError::Decode { action, source })?;

        let mut by_name = HashMap::with_capacity(items.len());
        for item in items {
            if let Some(previous) = by_name.insert(item.name.clone(), item.id) {
                warn!(name = %item.name, %previous, "duplicate name, keeping the later entry");
            }
        }
        Ok(by_name)
    }

    /// Replace the figurine's whole chapter list. Chapters not in `chapters`
    /// are gone afterwards.
    pub fn publish(
        &self,
        household_id: &str,
        figurine_id: &str,
        chapters: &[Chapter],
    ) -> Result<(), ApiError> {
        let action = "updating chapters";
        let url = self.endpoints.api(&format!(
            "/households/{household_id}/creativetonies/{figurine_id}"
        ));
        debug!(%url, count = chapters.len(), "{action}");
        let res = self
            .api
            .patch(&url)
            .json(&ChapterUpdate { chapters })
            .send()
            .map_err(|source| ApiError::Transport { action, source })?;
        check_status(action, res)?;
        Ok(())
    }
}

/// Vendor endpoints answer 200 on success; anything else becomes an
/// `ApiError` carrying the body text.
pub(crate) fn check_status(
    action: &'static str,
    res: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, ApiError> {
    if res.status() != StatusCode::OK {
        let status = res.status();
        return Err(ApiError::Status {
            action,
            status,
            body: read_body(res),
        });
    }
    Ok(res)
}
