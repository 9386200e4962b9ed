use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::models::ClassRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid store URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Store rejected request with {status}: {body}")]
    Rejected { status: StatusCode, body: String },
    #[error("Sign-in failed: {0}")]
    Auth(String),
}

/// The table the scraped classes are republished into.
#[allow(async_fn_in_trait)]
pub trait ClassStore {
    /// Removes every stored row for `studio`. Removing nothing is not an error.
    async fn delete_studio(&self, studio: &str) -> Result<(), StoreError>;

    async fn insert_batch(&self, records: &[ClassRecord]) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub url: String,
    pub api_key: String,
    pub table: String,
    pub timeout: Duration,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// PostgREST table access behind a Supabase project.
#[derive(Clone)]
pub struct SupabaseStore {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
    table: String,
    bearer: String,
}

impl SupabaseStore {
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        let base_url = Url::parse(config.url.trim_end_matches('/'))?;
        Ok(Self {
            client,
            base_url,
            bearer: config.api_key.clone(),
            api_key: config.api_key,
            table: config.table,
        })
    }

    /// Signs in with email and password; later requests carry the user's token.
    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<(), StoreError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let response = self
            .client
            .post(url)
            .header("apikey", &self.api_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Auth(format!("{status}: {body}")));
        }
        let token: TokenResponse = response.json().await?;
        self.bearer = token.access_token;
        info!(%email, "signed in to store");
        Ok(())
    }

    /// Cheap reachability check against the class table.
    pub async fn ping(&self) -> Result<(), StoreError> {
        let mut url = self.table_url()?;
        url.query_pairs_mut().append_pair("select", "count");
        self.execute(self.client.get(url)).await
    }

    fn endpoint(&self, path: &str) -> Result<Url, StoreError> {
        Ok(Url::parse(&format!("{}/{path}", self.base_url.as_str().trim_end_matches('/')))?)
    }

    fn table_url(&self) -> Result<Url, StoreError> {
        self.endpoint(&format!("rest/v1/{}", self.table))
    }

    async fn execute(&self, request: RequestBuilder) -> Result<(), StoreError> {
        let response = request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.bearer)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Rejected { status, body })
    }
}

impl ClassStore for SupabaseStore {
    async fn delete_studio(&self, studio: &str) -> Result<(), StoreError> {
        let mut url = self.table_url()?;
        url.query_pairs_mut()
            .append_pair("studio_name", &format!("eq.{studio}"));
        self.execute(self.client.delete(url)).await?;
        debug!(studio, table = %self.table, "deleted stored classes");
        Ok(())
    }

    async fn insert_batch(&self, records: &[ClassRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let request = self
            .client
            .post(self.table_url()?)
            .header("Prefer", "return=minimal")
            .json(records);
        self.execute(request).await?;
        debug!(count = records.len(), table = %self.table, "inserted classes");
        Ok(())
    }
}
