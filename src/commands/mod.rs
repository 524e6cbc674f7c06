use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::cli::{Cli, Command};
use crate::client::Client;
use crate::config::{RuntimeConfig, resolve_runtime_config};
use crate::error::ErrorOut;
use crate::output::Envelope;
use crate::transport::ReqwestTransport;

mod create;
mod delete;
mod login;

pub async fn dispatch(cli: &Cli, cancel: &CancellationToken) -> Envelope<Value> {
    let command_name = cli.command.name();

    let cfg = match resolve_runtime_config(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => return Envelope::err(command_name, e),
    };

    match &cli.command {
        Command::Login(args) => login::run(&cfg, args, cancel).await,
        Command::Create(args) => create::run(&cfg, args, cancel).await,
        Command::Delete(args) => delete::run(&cfg, args, cli.no_confirm, cancel).await,
    }
}

fn connect(cfg: &RuntimeConfig) -> Result<Client<ReqwestTransport>, ErrorOut> {
    let transport = ReqwestTransport::new()
        .map_err(|e| ErrorOut::http(format!("http client init failed: {e}")))?;
    let client = Client::new(transport, cfg.client.clone());
    Ok(match &cfg.credentials {
        Some(creds) => client.with_credentials(creds.clone()),
        None => client,
    })
}
