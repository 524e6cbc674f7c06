use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::{Client, Credentials};
use crate::error::{FastmailError, LoginStep};
use crate::protocol::nullable;
use crate::transport::{HttpRequest, StatusClass, Transport};

/// `primaryAccounts` key naming the account that owns masked emails.
pub const ACCOUNT_CAPABILITY: &str = "https://www.fastmail.com/dev/mail";

const TOTP: &str = "totp";
const PASSWORD: &str = "password";

#[derive(Debug, Serialize)]
struct UsernameRequest<'a> {
    username: &'a str,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthFlowMessage {
    #[serde(
        rename = "loginId",
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "String::is_empty"
    )]
    pub login_id: String,

    #[serde(
        rename = "type",
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "String::is_empty"
    )]
    pub kind: String,

    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "String::is_empty"
    )]
    pub value: String,

    #[serde(default, deserialize_with = "nullable")]
    pub remember: bool,

    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<AuthMethod>,
}

impl AuthFlowMessage {
    fn answer(login_id: &str, kind: &str, value: &str) -> Self {
        Self {
            login_id: login_id.to_string(),
            kind: kind.to_string(),
            value: value.to_string(),
            ..Self::default()
        }
    }

    fn offers(&self, kind: &str) -> bool {
        self.methods.iter().any(|m| m.kind == kind)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthMethod {
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub kind: String,
}

/// Final answer of a successful handshake. Only the fields the client uses are kept.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthResponse {
    #[serde(rename = "accessToken", default, deserialize_with = "nullable")]
    pub access_token: String,

    #[serde(rename = "primaryAccounts", default, deserialize_with = "nullable")]
    pub primary_accounts: BTreeMap<String, String>,

    #[serde(rename = "displayName", default, deserialize_with = "nullable")]
    pub display_name: String,

    #[serde(rename = "userId", default, deserialize_with = "nullable")]
    pub user_id: String,
}

impl AuthResponse {
    pub fn mail_account_id(&self) -> Option<&str> {
        self.primary_accounts
            .get(ACCOUNT_CAPABILITY)
            .map(String::as_str)
    }
}

/// `username` yields a `loginId`. The password answer either carries an access token straight
/// away or lists further challenges, of which only `totp` is handled. Steps run strictly in
/// order and nothing is retried.
enum LoginState {
    AwaitingLoginId,
    AwaitingPasswordResult { login_id: String, mfa_offered: bool },
    AwaitingMfaResult { login_id: String, code: String },
    Authenticated(AuthResponse),
}

impl<T: Transport> Client<T> {
    /// Run the whole handshake from scratch. On success the credentials are stored on the
    /// client and returned. `mfa_code` may be empty when the account has no second factor.
    pub async fn login(
        &mut self,
        username: &str,
        password: &str,
        mfa_code: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Credentials, FastmailError> {
        let mfa_code = mfa_code.filter(|c| !c.is_empty());
        let mut state = LoginState::AwaitingLoginId;

        let auth = loop {
            state = match state {
                LoginState::AwaitingLoginId => {
                    let flow: AuthFlowMessage = self
                        .auth_step(LoginStep::LoginId, &UsernameRequest { username }, cancel)
                        .await?;
                    tracing::debug!(methods = flow.methods.len(), "received loginId");
                    LoginState::AwaitingPasswordResult {
                        mfa_offered: flow.offers(TOTP),
                        login_id: flow.login_id,
                    }
                }

                LoginState::AwaitingPasswordResult {
                    login_id,
                    mfa_offered,
                } => {
                    let answer = AuthFlowMessage::answer(&login_id, PASSWORD, password);
                    let body: serde_json::Value =
                        self.auth_step(LoginStep::Password, &answer, cancel).await?;

                    let auth = AuthResponse::deserialize(&body).map_err(|source| {
                        FastmailError::Json {
                            context: "decode password response",
                            source,
                        }
                    })?;
                    if !auth.access_token.is_empty() {
                        LoginState::Authenticated(auth)
                    } else {
                        let flow = AuthFlowMessage::deserialize(&body).map_err(|source| {
                            FastmailError::Json {
                                context: "decode password response",
                                source,
                            }
                        })?;
                        let mfa_required = mfa_offered || flow.offers(TOTP);

                        match (mfa_required, mfa_code) {
                            (true, None) => return Err(FastmailError::MfaRequired),
                            (true, Some(code)) => LoginState::AwaitingMfaResult {
                                login_id: if flow.login_id.is_empty() {
                                    login_id
                                } else {
                                    flow.login_id
                                },
                                code: code.to_string(),
                            },
                            (false, _) => {
                                return Err(FastmailError::AccessTokenNotFound {
                                    step: LoginStep::Password,
                                });
                            }
                        }
                    }
                }

                LoginState::AwaitingMfaResult { login_id, code } => {
                    let answer = AuthFlowMessage::answer(&login_id, TOTP, &code);
                    let auth: AuthResponse =
                        self.auth_step(LoginStep::Mfa, &answer, cancel).await?;
                    if auth.access_token.is_empty() {
                        return Err(FastmailError::AccessTokenNotFound {
                            step: LoginStep::Mfa,
                        });
                    }
                    LoginState::Authenticated(auth)
                }

                LoginState::Authenticated(auth) => break auth,
            };
        };

        let account_id = auth
            .mail_account_id()
            .ok_or_else(|| FastmailError::AccountIdNotFound {
                capability: ACCOUNT_CAPABILITY.to_string(),
            })?
            .to_string();

        tracing::info!(account_id = %account_id, "login succeeded");
        let creds = Credentials::new(account_id, auth.access_token);
        self.credentials = Some(creds.clone());
        Ok(creds)
    }

    async fn auth_step<B, R>(
        &self,
        step: LoginStep,
        body: &B,
        cancel: &CancellationToken,
    ) -> Result<R, FastmailError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let body = serde_json::to_vec(body).map_err(|source| FastmailError::Json {
            context: "encode login request",
            source,
        })?;
        let request = HttpRequest {
            url: self.config.auth_url.clone(),
            body,
            bearer: None,
        };

        tracing::debug!(%step, "login step");
        let reply = self
            .transport
            .post(request, cancel)
            .await
            .map_err(FastmailError::transport("login"))?;

        if reply.class() != StatusClass::Success {
            return Err(FastmailError::HandshakeRejected {
                step,
                status: reply.status.as_u16(),
                detail: reply.body_text(),
            });
        }

        serde_json::from_slice(&reply.body).map_err(|source| FastmailError::Json {
            context: "decode login response",
            source,
        })
    }
}
