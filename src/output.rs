use serde::Serialize;

use crate::error::ErrorOut;

#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T>
where
    T: Serialize,
{
    #[serde(rename = "schemaVersion")]
    pub schema_version: String,

    pub ok: bool,
    pub command: String,
    pub data: Option<T>,
    pub error: Option<ErrorOut>,
}

impl<T> Envelope<T>
where
    T: Serialize,
{
    pub fn ok(command: impl Into<String>, data: T) -> Self {
        Self {
            schema_version: "0.1".to_string(),
            ok: true,
            command: command.into(),
            data: Some(data),
            error: None,
        }
    }

    pub fn err(command: impl Into<String>, error: impl Into<ErrorOut>) -> Self {
        Self {
            schema_version: "0.1".to_string(),
            ok: false,
            command: command.into(),
            data: None,
            error: Some(error.into()),
        }
    }
}

pub fn print_envelope<T>(env: &Envelope<T>)
where
    T: Serialize,
{
    match serde_json::to_string_pretty(env) {
        Ok(text) => println!("{text}"),
        Err(e) => println!(
            "{}",
            serde_json::json!({
                "ok": false,
                "error": {"kind": "internal", "message": format!("serialize failed: {e}")}
            })
        ),
    }
}
