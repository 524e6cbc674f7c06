use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::cookie::Jar;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("cancelled")]
    Cancelled,
}

/// A JSON POST. Content-Type and Accept are always `application/json`.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: Url,
    pub body: Vec<u8>,
    pub bearer: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Unauthorized,
    Other,
}

impl HttpReply {
    pub fn class(&self) -> StatusClass {
        if self.status.is_success() {
            StatusClass::Success
        } else if self.status == StatusCode::UNAUTHORIZED {
            StatusClass::Unauthorized
        } else {
            StatusClass::Other
        }
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one exchange. Must return promptly with `Cancelled` once `cancel` fires.
    async fn post(
        &self,
        request: HttpRequest,
        cancel: &CancellationToken,
    ) -> Result<HttpReply, TransportError>;
}

/// reqwest-backed transport. The cookie jar lives as long as the handle, so every step of a
/// login handshake shares one session.
#[derive(Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
    jar: Arc<Jar>,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .user_agent(concat!("fastmask/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, jar })
    }

    pub fn cookie_jar(&self) -> &Arc<Jar> {
        &self.jar
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post(
        &self,
        request: HttpRequest,
        cancel: &CancellationToken,
    ) -> Result<HttpReply, TransportError> {
        let url = request.url.clone();
        let mut builder = self
            .http
            .post(request.url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(request.body);
        if let Some(token) = request.bearer {
            builder = builder.bearer_auth(token);
        }

        let exchange = async {
            let resp = builder.send().await?;
            let status = resp.status();
            let headers = resp.headers().clone();
            let body = resp.bytes().await?.to_vec();
            Ok::<_, reqwest::Error>(HttpReply {
                status,
                headers,
                body,
            })
        };

        let reply = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransportError::Cancelled),
            r = exchange => r?,
        };
        tracing::debug!(url = %url, status = %reply.status, "http exchange");
        Ok(reply)
    }
}
