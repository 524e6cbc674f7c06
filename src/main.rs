use clap::Parser;
use tokio_util::sync::CancellationToken;

use fastmask::{cli, commands, debug, output};

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();
    debug::set_verbose(cli.verbose);
    debug::init_tracing();

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let env = commands::dispatch(&cli, &cancel).await;
    output::print_envelope(&env);

    if !env.ok {
        std::process::exit(1);
    }
}
