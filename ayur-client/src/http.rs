//! HTTP client for the marketplace REST API
//!
//! [`NetworkHttpClient`] carries a default `Authorization` credential shared by
//! every clone, so whichever component holds a clone sends (or stops sending)
//! the bearer token as soon as the session changes it.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::client::{
    AuthResponse, AuthSession, LoginRequest, MeResponse, PasswordUpdate, ProfileResponse,
    ProfileUpdate, RegisterRequest, SuccessResponse,
};
use shared::{ErrorBody, UserRecord};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Backend operations the session depends on
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// `POST auth/login`
    async fn login(&self, request: &LoginRequest) -> ClientResult<AuthSession>;
    /// `POST auth/register`
    async fn register(&self, request: &RegisterRequest) -> ClientResult<AuthSession>;
    /// `GET auth/me` with the current credential
    async fn me(&self) -> ClientResult<UserRecord>;
    /// `PUT profile`
    async fn update_profile(&self, update: &ProfileUpdate) -> ClientResult<UserRecord>;
    /// `PUT profile/password`
    async fn update_password(&self, update: &PasswordUpdate) -> ClientResult<()>;

    /// Replace the default credential sent with every request
    fn set_credential(&self, token: Option<&str>);
    /// Current `Authorization` header value, if any
    fn credential(&self) -> Option<String>;
}

/// Network HTTP client
#[derive(Debug, Clone)]
pub struct NetworkHttpClient {
    client: Client,
    base_url: String,
    authorization: Arc<RwLock<Option<String>>>,
}

impl NetworkHttpClient {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            authorization: Arc::new(RwLock::new(None)),
        })
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn with_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match self.credential() {
            Some(auth) => request.header(reqwest::header::AUTHORIZATION, auth),
            None => request,
        }
    }

    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message);
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_slice(&body).map_err(|e| ClientError::MalformedResponse(e.to_string()))
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let request = self.with_auth(self.client.get(self.url(path)));
        Self::handle_response(request.send().await?).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let request = self.with_auth(self.client.post(self.url(path)).json(body));
        Self::handle_response(request.send().await?).await
    }

    /// Make a PUT request with JSON body
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let request = self.with_auth(self.client.put(self.url(path)).json(body));
        Self::handle_response(request.send().await?).await
    }
}

fn missing(endpoint: &str, field: &str) -> ClientError {
    ClientError::MalformedResponse(format!("{endpoint} response is missing `{field}`"))
}

#[async_trait]
impl AuthApi for NetworkHttpClient {
    async fn login(&self, request: &LoginRequest) -> ClientResult<AuthSession> {
        let resp: AuthResponse = self.post("auth/login", request).await?;
        resp.into_session()
            .map_err(|field| missing("auth/login", field))
    }

    async fn register(&self, request: &RegisterRequest) -> ClientResult<AuthSession> {
        let resp: AuthResponse = self.post("auth/register", request).await?;
        resp.into_session()
            .map_err(|field| missing("auth/register", field))
    }

    async fn me(&self) -> ClientResult<UserRecord> {
        let resp: MeResponse = self.get("auth/me").await?;
        resp.data.ok_or_else(|| missing("auth/me", "data"))
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> ClientResult<UserRecord> {
        let resp: ProfileResponse = self.put("profile", update).await?;
        if !resp.success {
            return Err(ClientError::Api {
                status: 200,
                message: resp.message,
            });
        }
        resp.data.ok_or_else(|| missing("profile", "data"))
    }

    async fn update_password(&self, update: &PasswordUpdate) -> ClientResult<()> {
        let resp: SuccessResponse = self.put("profile/password", update).await?;
        if !resp.success {
            return Err(ClientError::Api {
                status: 200,
                message: resp.message,
            });
        }
        Ok(())
    }

    fn set_credential(&self, token: Option<&str>) {
        let mut slot = self
            .authorization
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = token.map(|t| format!("Bearer {}", t));
    }

    fn credential(&self) -> Option<String> {
        self.authorization
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
