//! Bot binary - wires configuration, the transfer pipeline and the Telegram poller.

use clipferry::adapters::gallery_dl;
use clipferry::adapters::telegram::{BotClient, Poller};
use clipferry::config::BotConfig;
use clipferry::domain::av::RealRemuxRunner;
use clipferry::domain::fetch::Fetcher;
use clipferry::TransferService;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("clipferry=info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    // 1. Extractor credentials
    let config_path = gallery_dl::default_config_path();
    if let Err(e) = gallery_dl::write_config(&config_path, &config.twitter_auth_token) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }

    // 2. Pipeline
    let fetcher = Fetcher::new(&config.gallery_dl_bin, config.limits.fetch_timeout);
    let runner = RealRemuxRunner::new(&config.ffmpeg_bin, &config.ffprobe_bin);
    let service = TransferService::new(fetcher, runner, config.limits)
        .with_scratch_root(config.scratch_dir.clone());

    // 3. Chat front end
    let client = match BotClient::new(&config.api_url, &config.bot_token) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Could not build Bot API client: {}", e);
            std::process::exit(1);
        }
    };
    let poller = Poller::new(client, config.access.clone(), service);

    tokio::select! {
        _ = poller.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down...");
        }
    }
}
