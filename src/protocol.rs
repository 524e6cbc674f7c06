use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::FastmailError;

pub const CORE_CAPABILITY: &str = "urn:ietf:params:jmap:core";
pub const MASKED_EMAIL_CAPABILITY: &str = "https://www.fastmail.com/dev/maskedemail";

/// Capabilities that must be declared together for any `MaskedEmail/*` call.
pub const MASKED_EMAIL_USING: [&str; 2] = [CORE_CAPABILITY, MASKED_EMAIL_CAPABILITY];

/// Method-response kind the server uses to report a failed call.
pub const ERROR_RESPONSE: &str = "error";

/// Capability URIs plus an ordered list of method calls.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Request {
    pub using: Vec<String>,

    #[serde(rename = "methodCalls")]
    pub method_calls: Vec<MethodCall>,
}

impl Request {
    pub fn new<I, S>(using: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            using: using.into_iter().map(Into::into).collect(),
            method_calls: Vec::new(),
        }
    }

    /// Request preloaded with the masked-email capability pair.
    pub fn masked_email() -> Self {
        Self::new(MASKED_EMAIL_USING)
    }

    pub fn call(mut self, call: MethodCall) -> Self {
        self.method_calls.push(call);
        self
    }

    pub fn encode(&self) -> Result<Vec<u8>, FastmailError> {
        serde_json::to_vec(self).map_err(|source| FastmailError::Json {
            context: "encode request",
            source,
        })
    }
}

/// One invocation: `[name, payload, id]` on the wire.
///
/// Responses reuse the same shape, with the first slot holding the response kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MethodCall {
    pub name: String,
    pub payload: Value,
    pub id: String,
}

pub type MethodResponse = MethodCall;

impl MethodCall {
    pub fn new<P: Serialize>(
        name: impl Into<String>,
        payload: &P,
        id: impl Into<String>,
    ) -> Result<Self, FastmailError> {
        let payload = serde_json::to_value(payload).map_err(|source| FastmailError::Json {
            context: "encode method call payload",
            source,
        })?;
        Ok(Self {
            name: name.into(),
            payload,
            id: id.into(),
        })
    }

    /// Lenient slot reading: non-string name/id become empty, a missing payload becomes null.
    pub fn from_slots(slots: &[Value]) -> Self {
        let text = |i: usize| {
            slots
                .get(i)
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_default()
        };
        Self {
            name: text(0),
            payload: slots.get(1).cloned().unwrap_or(Value::Null),
            id: text(2),
        }
    }

    pub fn is_error(&self) -> bool {
        self.name == ERROR_RESPONSE
    }

    /// Decode the payload into `T`, failing first if the server answered with an error
    /// response instead of `expected`.
    pub fn project<T: DeserializeOwned>(&self, expected: &str) -> Result<T, FastmailError> {
        if self.is_error() {
            let err: MethodError = serde_json::from_value(self.payload.clone()).unwrap_or_default();
            return Err(FastmailError::Method {
                method: expected.to_string(),
                kind: err.kind,
                description: err.description,
            });
        }

        T::deserialize(&self.payload).map_err(|source| FastmailError::Json {
            context: "decode method response payload",
            source,
        })
    }
}

impl Serialize for MethodCall {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.name, &self.payload, &self.id).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MethodCall {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let slots = Vec::<Value>::deserialize(deserializer)?;
        Ok(Self::from_slots(&slots))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct MethodError {
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    kind: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Response {
    #[serde(rename = "latestClientVersion", default, deserialize_with = "nullable")]
    pub latest_client_version: String,

    /// Entries kept raw so their arity can be checked before anything is projected.
    #[serde(rename = "methodResponses", default, deserialize_with = "nullable")]
    pub method_responses: Vec<Value>,

    #[serde(rename = "sessionState", default, deserialize_with = "nullable")]
    pub session_state: String,
}

impl Response {
    pub fn decode(body: &[u8]) -> Result<Self, FastmailError> {
        serde_json::from_slice(body).map_err(|source| FastmailError::Json {
            context: "decode response envelope",
            source,
        })
    }

    /// Isolate the call at `ordinal`, insisting on exactly `expected` responses in the batch
    /// and a 3-slot tuple at that position.
    pub fn extract(&self, ordinal: usize, expected: usize) -> Result<MethodResponse, FastmailError> {
        if self.method_responses.len() != expected {
            return Err(FastmailError::MethodResponseShape {
                what: "method responses",
                got: self.method_responses.len(),
                expected,
            });
        }

        let slots = self.method_responses.get(ordinal).and_then(Value::as_array);
        match slots {
            Some(slots) if slots.len() == 3 => Ok(MethodCall::from_slots(slots)),
            Some(slots) => Err(FastmailError::MethodResponseShape {
                what: "method response slots",
                got: slots.len(),
                expected: 3,
            }),
            None => Err(FastmailError::MethodResponseShape {
                what: "method response slots",
                got: 0,
                expected: 3,
            }),
        }
    }

    /// Every entry, read leniently. Non-array entries come back as empty calls.
    pub fn responses(&self) -> impl Iterator<Item = MethodResponse> + '_ {
        self.method_responses
            .iter()
            .map(|v| v.as_array().map(|a| MethodCall::from_slots(a)).unwrap_or_default())
    }
}

/// Treat an explicit `null` like a missing field.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
