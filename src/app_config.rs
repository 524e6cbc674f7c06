use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::client::{CredentialStore, Credentials};
use crate::error::ErrorOut;

#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(rename = "accountId", default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,

    #[serde(rename = "accessToken", default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Override for the JMAP API endpoint.
    #[serde(rename = "apiUrl", default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Override for the login endpoint.
    #[serde(rename = "authUrl", default, skip_serializing_if = "Option::is_none")]
    pub auth_url: Option<String>,
}

impl AppConfig {
    pub fn credentials(&self) -> Option<Credentials> {
        let account_id = self.account_id.as_ref().filter(|s| !s.trim().is_empty())?;
        let token = self.access_token.as_ref().filter(|s| !s.trim().is_empty())?;
        Some(Credentials::new(account_id.trim(), token.trim()))
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("account_id", &self.account_id)
            .field("api_url", &self.api_url)
            .field("auth_url", &self.auth_url)
            .finish_non_exhaustive()
    }
}

fn home_dir() -> Result<PathBuf, ErrorOut> {
    let home = std::env::var("HOME")
        .map_err(|_| ErrorOut::config("missing HOME environment variable".to_string()))?;
    Ok(PathBuf::from(home))
}

pub fn default_config_path() -> Result<PathBuf, ErrorOut> {
    if let Ok(p) = std::env::var("FASTMASK_CONFIG_PATH") {
        return Ok(PathBuf::from(p));
    }

    let base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => home_dir()?.join(".config"),
    };
    Ok(base.join("fastmask/config.json"))
}

/// `Ok(None)` when the file does not exist yet.
pub fn read_config(path: &Path) -> Result<Option<AppConfig>, ErrorOut> {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ErrorOut::config(format!(
                "failed to read config {}: {e}",
                path.display()
            )));
        }
    };
    let cfg = serde_json::from_str(&text)
        .map_err(|e| ErrorOut::config(format!("invalid config json: {e}")))?;
    Ok(Some(cfg))
}

pub fn write_config(path: &Path, cfg: &AppConfig) -> Result<(), ErrorOut> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| ErrorOut::config(format!("config mkdir failed: {e}")))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(parent, fs::Permissions::from_mode(0o700));
        }
    }

    let text = serde_json::to_string_pretty(cfg)
        .map_err(|e| ErrorOut::config(format!("config serialize failed: {e}")))?;

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, format!("{text}\n"))
        .map_err(|e| ErrorOut::config(format!("config write failed: {e}")))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600));
    }
    fs::rename(&tmp, path).map_err(|e| ErrorOut::config(format!("config rename failed: {e}")))?;

    Ok(())
}

/// Credentials kept in the JSON config file next to the endpoint overrides.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    type Error = ErrorOut;

    fn load(&self) -> Result<Option<Credentials>, ErrorOut> {
        Ok(read_config(&self.path)?.and_then(|cfg| cfg.credentials()))
    }

    fn save(&self, credentials: &Credentials) -> Result<(), ErrorOut> {
        let mut cfg = read_config(&self.path)?.unwrap_or_default();
        cfg.account_id = Some(credentials.account_id.clone());
        cfg.access_token = Some(credentials.access_token.clone());
        write_config(&self.path, &cfg)
    }
}
