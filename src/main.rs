use colored::Colorize;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use trueconnect::api;

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().json().flatten_event(true))
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    dotenv::dotenv().ok();

    // Fail fast on missing secrets rather than at the first login.
    if std::env::var("JWT_SECRET").is_err() {
        eprintln!(
            "{}",
            "JWT_SECRET must be set in environment for production!".red()
        );
        std::process::exit(1);
    }

    api::start_http_server().await;
}
