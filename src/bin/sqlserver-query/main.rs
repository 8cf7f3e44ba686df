mod args;

use std::process::ExitCode;

use clap::Parser;
use sqlserver_helpers::prelude::*;
use tracing::Level;

use crate::args::Args;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_max_level(Level::from(args.log_level))
        .init();

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<(), SqlServerError> {
    let options = SqlServerOptions::from_json_file(&args.config)?.apply_env_overrides()?;

    tracing::info!("Logging in...");
    let mut server = SqlServer::connect(options).await?;

    let rows = server.do_query(&args.query, QueryOptions::default()).await?;
    for row in &rows.results {
        if let Some(value) = row.get_by_index(0) {
            println!("{value}");
        }
    }

    server.close().await
}
