use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use kyc_service::api;
use kyc_service::config::AppConfig;

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().json().flatten_event(true))
        .init();
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env();
    if let Err(e) = api::start_http_server(config).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
