use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::client::Client;
use crate::error::FastmailError;
use crate::protocol::{MethodCall, Request, nullable};
use crate::transport::Transport;

pub const MASKED_EMAIL_SET: &str = "MaskedEmail/set";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskedEmailState {
    Enabled,
    Disabled,
    #[serde(other)]
    Other,
}

impl MaskedEmailState {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            MaskedEmailState::Enabled
        } else {
            MaskedEmailState::Disabled
        }
    }
}

/// A masked email address. On create only `for_domain`, `description` and `state` are sent;
/// everything else is filled in by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskedEmail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<MaskedEmailState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub for_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<DateTime<Utc>>,
}

impl MaskedEmail {
    pub fn for_domain(domain: impl Into<String>) -> Self {
        Self {
            for_domain: Some(domain.into()),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let d = description.into();
        self.description = (!d.is_empty()).then_some(d);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskedEmailSet {
    pub account_id: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub create: BTreeMap<String, MaskedEmail>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub destroy: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetError {
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub kind: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodResponseMaskedEmailSet {
    #[serde(default, deserialize_with = "nullable")]
    pub account_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub created: BTreeMap<String, MaskedEmail>,
    #[serde(default, deserialize_with = "nullable")]
    pub updated: BTreeMap<String, Value>,
    #[serde(default, deserialize_with = "nullable")]
    pub destroyed: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub not_created: BTreeMap<String, SetError>,
    #[serde(default, deserialize_with = "nullable")]
    pub not_destroyed: BTreeMap<String, SetError>,
    #[serde(default)]
    pub new_state: Value,
    #[serde(default)]
    pub old_state: Value,
}

impl MethodResponseMaskedEmailSet {
    /// The single created entry, whatever creation key the server echoes back.
    pub fn created_item(self) -> Result<MaskedEmail, FastmailError> {
        self.created
            .into_values()
            .next()
            .ok_or(FastmailError::NoItemsReturned)
    }
}

impl<T: Transport> Client<T> {
    /// Create a masked email. `enabled = false` creates it disabled.
    pub async fn create_masked_email(
        &self,
        mut masked: MaskedEmail,
        enabled: bool,
        cancel: &CancellationToken,
    ) -> Result<MaskedEmail, FastmailError> {
        let creds = self.require_credentials()?;
        masked.state = Some(MaskedEmailState::from_enabled(enabled));

        let args = MaskedEmailSet {
            account_id: creds.account_id.clone(),
            create: BTreeMap::from([(self.config.app_name.clone(), masked)]),
            destroy: Vec::new(),
        };
        let request = Request::masked_email().call(MethodCall::new(MASKED_EMAIL_SET, &args, "0")?);

        let response = self
            .send_request("MaskedEmail/set create", &request, cancel)
            .await?;
        let set: MethodResponseMaskedEmailSet = response.extract(0, 1)?.project(MASKED_EMAIL_SET)?;

        for (key, err) in &set.not_created {
            tracing::warn!(key = %key, kind = %err.kind, description = ?err.description, "masked email not created");
        }

        let created = set.created_item()?;
        tracing::debug!(id = ?created.id, "masked email created");
        Ok(created)
    }

    /// Destroy masked emails by id. A response the client cannot interpret still counts as
    /// success; ids the server explicitly lists under `notDestroyed` do not.
    pub async fn delete_masked_emails<I, S>(
        &self,
        ids: I,
        cancel: &CancellationToken,
    ) -> Result<(), FastmailError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let creds = self.require_credentials()?;
        let destroy: Vec<String> = ids.into_iter().map(Into::into).collect();
        if destroy.is_empty() {
            tracing::debug!("no masked emails to delete");
            return Ok(());
        }

        let args = MaskedEmailSet {
            account_id: creds.account_id.clone(),
            create: BTreeMap::new(),
            destroy,
        };
        let request = Request::masked_email().call(MethodCall::new(MASKED_EMAIL_SET, &args, "0")?);

        let response = self
            .send_request("MaskedEmail/set destroy", &request, cancel)
            .await?;

        let Ok(call) = response.extract(0, 1) else {
            tracing::debug!(
                responses = response.method_responses.len(),
                "uninterpretable destroy response"
            );
            return Ok(());
        };
        let set: MethodResponseMaskedEmailSet = match call.project(MASKED_EMAIL_SET) {
            Ok(set) => set,
            Err(FastmailError::Json { source, .. }) => {
                tracing::debug!(error = %source, "uninterpretable destroy payload");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if !set.not_destroyed.is_empty() {
            return Err(FastmailError::NotDestroyed {
                ids: set.not_destroyed.into_keys().collect(),
            });
        }

        tracing::debug!(destroyed = set.destroyed.len(), "masked emails deleted");
        Ok(())
    }
}
