//! Podcast Promo Bot — Binary Entrypoint
//! One run per invocation: pick an episode, resolve its canonical link,
//! fit the post text, publish. Designed to be driven by cron/CI.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use podcast_promo_bot::config::Config;
use podcast_promo_bot::pipeline;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() {
    // Load .env in local/dev; no-op when the vars come from the runner.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = ?e, "configuration error");
            std::process::exit(2);
        }
    };

    let mut rng = StdRng::from_os_rng();
    if let Err(e) = pipeline::run(&cfg, &mut rng).await {
        tracing::error!(error = ?e, "run failed");
        std::process::exit(1);
    }
}
