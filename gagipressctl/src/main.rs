use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[tokio::main]
async fn main() {
    let cli = gagipressctl::Cli::parse();
    gagipressctl::init_tracing(cli.verbose);

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            interrupt.cancel();
        }
    });

    if let Err(err) = gagipressctl::run(cli, cancel).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
