use clap::Parser;
use redbiom::utils::logger;
use redbiom::{run_search, Cli, RedbiomConfig, RedbiomError};
use std::io;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    // 配置在日誌之前載入，日誌格式來自配置
    let config = match RedbiomConfig::resolve(cli.config.as_deref(), cli.host.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    logger::init_cli_logger(cli.verbose, config.log_format);
    if let Some(path) = RedbiomConfig::source_path(cli.config.as_deref()) {
        tracing::debug!("Loaded configuration from {}", path.display());
    }
    tracing::debug!("Effective configuration: {:?}", config);

    if let Err(e) = run(cli, &config).await {
        if e.is_broken_pipe() {
            return;
        }
        tracing::error!("❌ Search failed: {} (Category: {:?})", e, e.category());
        eprintln!("❌ {}", e);
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &RedbiomConfig) -> Result<(), RedbiomError> {
    let request = cli.into_search_command().into_request()?;

    let mut out = io::stdout().lock();
    let written = run_search(config, &request, &mut out).await?;

    tracing::info!("✅ {} results", written);
    Ok(())
}
