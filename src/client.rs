use std::fmt;

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::FastmailError;
use crate::protocol::{Request, Response};
use crate::transport::{HttpRequest, StatusClass, Transport};

/// JMAP API endpoint.
pub const API_ENDPOINT: &str = "https://api.fastmail.com/jmap/api/";
/// Login handshake endpoint.
pub const AUTH_ENDPOINT: &str = "https://www.fastmail.com/jmap/authenticate/";

pub const APP_NAME: &str = "fastmask";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Also used as the creation key inside `MaskedEmail/set` calls.
    pub app_name: String,
    pub api_url: Url,
    pub auth_url: Url,
}

impl ClientConfig {
    pub fn new(api_url: Url, auth_url: Url) -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            api_url,
            auth_url,
        }
    }

    /// The production endpoints.
    pub fn fastmail() -> Result<Self, url::ParseError> {
        Ok(Self::new(
            Url::parse(API_ENDPOINT)?,
            Url::parse(AUTH_ENDPOINT)?,
        ))
    }
}

/// Account id plus bearer token. The account id is not the email address.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub account_id: String,
    pub access_token: String,
}

impl Credentials {
    pub fn new(account_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            access_token: access_token.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account_id", &self.account_id)
            .finish_non_exhaustive()
    }
}

/// Where credentials come from before a call and go to after a login.
pub trait CredentialStore {
    type Error;

    fn load(&self) -> Result<Option<Credentials>, Self::Error>;
    fn save(&self, credentials: &Credentials) -> Result<(), Self::Error>;
}

/// One transport handle plus at most one credential pair. Credentials are set before use or by
/// `login`, and only read afterwards.
pub struct Client<T> {
    pub(crate) transport: T,
    pub(crate) config: ClientConfig,
    pub(crate) credentials: Option<Credentials>,
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self {
            transport,
            config,
            credentials: None,
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub(crate) fn require_credentials(&self) -> Result<&Credentials, FastmailError> {
        self.credentials.as_ref().ok_or(FastmailError::NotAuthenticated)
    }

    /// POST one batch to the API endpoint and decode the envelope.
    pub async fn send_request(
        &self,
        context: &'static str,
        request: &Request,
        cancel: &CancellationToken,
    ) -> Result<Response, FastmailError> {
        let creds = self.require_credentials()?;
        let http = HttpRequest {
            url: self.config.api_url.clone(),
            body: request.encode()?,
            bearer: Some(creds.access_token.clone()),
        };

        let reply = self
            .transport
            .post(http, cancel)
            .await
            .map_err(FastmailError::transport(context))?;

        match reply.class() {
            StatusClass::Success => {
                let response = Response::decode(&reply.body)?;
                tracing::debug!(
                    context,
                    responses = response.method_responses.len(),
                    latest_client_version = %response.latest_client_version,
                    "api response"
                );
                Ok(response)
            }
            StatusClass::Unauthorized => Err(FastmailError::Unauthorized),
            StatusClass::Other => Err(FastmailError::Api {
                context,
                status: reply.status.as_u16(),
                detail: reply.body_text(),
            }),
        }
    }
}
