use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use crate::app_config::FileCredentialStore;
use crate::cli::LoginArgs;
use crate::client::CredentialStore;
use crate::config::RuntimeConfig;
use crate::error::{ErrorOut, FastmailError};
use crate::output::Envelope;

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

pub async fn run(cfg: &RuntimeConfig, args: &LoginArgs, cancel: &CancellationToken) -> Envelope<Value> {
    let command_name = "login";

    let (Some(username), Some(password)) = (non_empty(&args.username), non_empty(&args.password))
    else {
        return Envelope::err(
            command_name,
            ErrorOut::usage("missing --username/--password (or FASTMASK_USERNAME/FASTMASK_PASSWORD)"),
        );
    };

    let mut client = match super::connect(cfg) {
        Ok(c) => c,
        Err(e) => return Envelope::err(command_name, e),
    };

    let creds = match client
        .login(username, password, non_empty(&args.mfa_code), cancel)
        .await
    {
        Ok(c) => c,
        Err(FastmailError::MfaRequired) => {
            let mut out = ErrorOut::from(FastmailError::MfaRequired);
            out.message.push_str("; pass --mfa-code");
            return Envelope::err(command_name, out);
        }
        Err(e) => return Envelope::err(command_name, e),
    };

    let store = FileCredentialStore::new(&cfg.config_path);
    if let Err(e) = store.save(&creds) {
        return Envelope::err(command_name, e);
    }

    Envelope::ok(
        command_name,
        json!({
            "accountId": creds.account_id,
            "configPath": store.path().to_string_lossy(),
        }),
    )
}
