use super::error::SyncError;
use crate::models::{Counters, CredentialsRequest, DeltaRequest, SessionResponse, TargetsRequest};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::{future::Future, time::Duration};

/// The server-side operations the sync engine depends on.
pub trait CounterRemote: Send + Sync + 'static {
    fn fetch_counters(
        &self,
        session: &str,
    ) -> impl Future<Output = Result<Counters, SyncError>> + Send;

    /// `delta` is always positive; the server applies the daily rollover first.
    fn apply_delta(
        &self,
        session: &str,
        delta: u64,
    ) -> impl Future<Output = Result<Counters, SyncError>> + Send;

    fn update_targets(
        &self,
        session: &str,
        targets: TargetsRequest,
    ) -> impl Future<Output = Result<Counters, SyncError>> + Send;

    /// Cheap reachability check used to detect coming back online.
    fn probe(&self) -> impl Future<Output = bool> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: String,
}

impl HttpRemote {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SyncError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<String, SyncError> {
        self.open_session("register", username, password).await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<String, SyncError> {
        self.open_session("login", username, password).await
    }

    pub async fn logout(&self, session: &str) -> Result<(), SyncError> {
        let request = self
            .client
            .post(self.url("/api/auth/logout"))
            .bearer_auth(session);
        check(send(request).await?).await?;
        Ok(())
    }

    async fn open_session(
        &self,
        mode: &str,
        username: &str,
        password: &str,
    ) -> Result<String, SyncError> {
        let request = self
            .client
            .post(self.url(&format!("/api/auth/{mode}")))
            .json(&CredentialsRequest {
                username: username.to_string(),
                password: password.to_string(),
            });
        let body: SessionResponse = check(send(request).await?).await?.json().await?;
        Ok(body.session)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl CounterRemote for HttpRemote {
    async fn fetch_counters(&self, session: &str) -> Result<Counters, SyncError> {
        let request = self
            .client
            .get(self.url("/api/counters"))
            .bearer_auth(session);
        Ok(check(send(request).await?).await?.json().await?)
    }

    async fn apply_delta(&self, session: &str, delta: u64) -> Result<Counters, SyncError> {
        if delta == 0 {
            return Err(SyncError::InvalidInput("delta must be positive"));
        }
        let request = self
            .client
            .post(self.url("/api/counters/delta"))
            .bearer_auth(session)
            .json(&DeltaRequest { delta });
        Ok(check(send(request).await?).await?.json().await?)
    }

    async fn update_targets(
        &self,
        session: &str,
        targets: TargetsRequest,
    ) -> Result<Counters, SyncError> {
        let request = self
            .client
            .put(self.url("/api/targets"))
            .bearer_auth(session)
            .json(&targets);
        Ok(check(send(request).await?).await?.json().await?)
    }

    async fn probe(&self) -> bool {
        match self.client.get(self.url("/api/health")).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

async fn send(request: RequestBuilder) -> Result<Response, SyncError> {
    Ok(request.send().await?)
}

async fn check(response: Response) -> Result<Response, SyncError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(SyncError::Unauthenticated);
    }
    let message = response.text().await.unwrap_or_default();
    Err(SyncError::Server(format!("{status}: {message}")))
}
