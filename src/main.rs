use clap::Parser;
use debfind::cli::{Cli, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so query output on stdout stays pipeable
    debfind::tracing::init(cli.verbose);

    run(cli).await.inspect_err(|e| {
        tracing::error!("{:#}", e);
    })
}
