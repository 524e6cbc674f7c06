use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "fastmask",
    version,
    about = "Un-official CLI for Fastmail masked emails",
    long_about = "Un-official CLI for Fastmail masked emails.\n\nNot endorsed or supported by Fastmail."
)]
pub struct Cli {
    /// Config file path (default: ~/.config/fastmask/config.json).
    #[arg(long, global = true, env = "FASTMASK_CONFIG_PATH")]
    pub config: Option<PathBuf>,

    /// Skip confirmation prompts.
    #[arg(short = 'y', long = "no-confirm", global = true)]
    pub no_confirm: bool,

    /// Verbose logging to stderr.
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and store the access token in the config file.
    Login(LoginArgs),

    /// Create a masked email for a domain.
    Create(CreateArgs),

    /// Delete masked emails by id.
    Delete(DeleteArgs),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Login(_) => "login",
            Command::Create(_) => "create",
            Command::Delete(_) => "delete",
        }
    }
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Fastmail email address.
    #[arg(short, long, env = "FASTMASK_USERNAME")]
    pub username: Option<String>,

    /// Fastmail password.
    #[arg(short, long, env = "FASTMASK_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// One-time code, only needed when the account has MFA enabled.
    #[arg(short = 'm', long = "mfa-code")]
    pub mfa_code: Option<String>,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Domain the masked email is for.
    pub domain: String,

    /// Description of the masked email.
    #[arg(short, long, default_value = "")]
    pub description: String,

    /// Create in disabled state; messages go to trash.
    #[arg(long)]
    pub disabled: bool,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Masked email ids.
    #[arg(required = true, num_args = 1..)]
    pub ids: Vec<String>,
}
