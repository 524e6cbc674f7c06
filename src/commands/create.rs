use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::cli::CreateArgs;
use crate::config::RuntimeConfig;
use crate::error::FastmailError;
use crate::masked_email::MaskedEmail;
use crate::output::Envelope;

pub async fn run(cfg: &RuntimeConfig, args: &CreateArgs, cancel: &CancellationToken) -> Envelope<Value> {
    let command_name = "create";

    let client = match super::connect(cfg) {
        Ok(c) => c,
        Err(e) => return Envelope::err(command_name, e),
    };

    let masked = MaskedEmail::for_domain(&args.domain).with_description(&args.description);
    let created = match client
        .create_masked_email(masked, !args.disabled, cancel)
        .await
    {
        Ok(m) => m,
        Err(e) => return Envelope::err(command_name, e),
    };

    match serde_json::to_value(&created) {
        Ok(v) => Envelope::ok(command_name, v),
        Err(source) => Envelope::err(
            command_name,
            FastmailError::Json {
                context: "encode created masked email",
                source,
            },
        ),
    }
}
