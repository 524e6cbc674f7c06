use std::io::{BufRead, Write};

use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use crate::cli::DeleteArgs;
use crate::config::RuntimeConfig;
use crate::output::Envelope;

fn confirm_delete() -> bool {
    let mut stderr = std::io::stderr();
    let _ = write!(stderr, "Confirm deletion of masked emails: (y/N): ");
    let _ = stderr.flush();

    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

pub async fn run(
    cfg: &RuntimeConfig,
    args: &DeleteArgs,
    no_confirm: bool,
    cancel: &CancellationToken,
) -> Envelope<Value> {
    let command_name = "delete";

    if !no_confirm && !confirm_delete() {
        return Envelope::ok(command_name, json!({"cancelled": true, "deleted": []}));
    }

    let client = match super::connect(cfg) {
        Ok(c) => c,
        Err(e) => return Envelope::err(command_name, e),
    };

    if let Err(e) = client.delete_masked_emails(args.ids.iter().cloned(), cancel).await {
        return Envelope::err(command_name, e);
    }

    Envelope::ok(command_name, json!({"cancelled": false, "deleted": args.ids}))
}
