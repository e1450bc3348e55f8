use clap::Parser;
use reply_guy::cli::commands::{cmd_reply, cmd_run};
use reply_guy::cli::config::{Cli, Commands, build_bulk_config, load_config};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref());

    match cli.command {
        Commands::Run {
            url,
            cap,
            rate_ms,
            no_submit,
        } => {
            let bulk = build_bulk_config(&config, cap, rate_ms, no_submit);
            cmd_run(&config, url.as_deref(), bulk).await?;
        }
        Commands::Reply { url, insert } => {
            let ok = cmd_reply(&config, &url, insert).await?;
            if !ok {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// RUST_LOG wins; otherwise `-v` raises the default level.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}
