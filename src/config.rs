use std::path::{Path, PathBuf};

use url::Url;

use crate::app_config;
use crate::client::{API_ENDPOINT, AUTH_ENDPOINT, ClientConfig, Credentials};
use crate::error::ErrorOut;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub client: ClientConfig,

    /// `None` until the user has logged in (or exported credentials).
    pub credentials: Option<Credentials>,

    /// Where login persists credentials.
    pub config_path: PathBuf,
}

fn parse_endpoint(value: &str, what: &str) -> Result<Url, ErrorOut> {
    Url::parse(value.trim()).map_err(|e| ErrorOut::config(format!("invalid {what} url: {e}")))
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_credentials_from_env() -> Result<Option<Credentials>, ErrorOut> {
    match (
        env_nonempty("FASTMASK_ACCOUNT_ID"),
        env_nonempty("FASTMASK_ACCESS_TOKEN"),
    ) {
        (Some(account_id), Some(token)) => Ok(Some(Credentials::new(account_id, token))),
        (None, None) => Ok(None),
        _ => Err(ErrorOut::config(
            "FASTMASK_ACCOUNT_ID and FASTMASK_ACCESS_TOKEN must be set together".to_string(),
        )),
    }
}

pub fn resolve_runtime_config(config_path: Option<&Path>) -> Result<RuntimeConfig, ErrorOut> {
    // Field-by-field precedence: env -> config file -> defaults.
    let config_path = match config_path {
        Some(p) => p.to_path_buf(),
        None => app_config::default_config_path()?,
    };
    let file = app_config::read_config(&config_path)?.unwrap_or_default();

    let api_url = env_nonempty("FASTMASK_API_URL")
        .or_else(|| file.api_url.clone())
        .unwrap_or_else(|| API_ENDPOINT.to_string());
    let auth_url = env_nonempty("FASTMASK_AUTH_URL")
        .or_else(|| file.auth_url.clone())
        .unwrap_or_else(|| AUTH_ENDPOINT.to_string());

    let credentials = match parse_credentials_from_env()? {
        Some(c) => Some(c),
        None => file.credentials(),
    };

    Ok(RuntimeConfig {
        client: ClientConfig::new(
            parse_endpoint(&api_url, "api")?,
            parse_endpoint(&auth_url, "auth")?,
        ),
        credentials,
        config_path,
    })
}
