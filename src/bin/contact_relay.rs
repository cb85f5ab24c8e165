#![forbid(unsafe_code)]

use std::net::SocketAddr;

use ambient_sfx_core::relay::{self, RelayConfig, ResendMailer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = match RelayConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("contact-relay: {err}");
            std::process::exit(2);
        }
    };

    let addr: SocketAddr = match cfg.bind.parse() {
        Ok(addr) => addr,
        Err(_) => {
            eprintln!("contact-relay: invalid CONTACT_RELAY_BIND: {}", cfg.bind);
            std::process::exit(2);
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("contact-relay: failed to bind {addr}: {err}");
            std::process::exit(1);
        }
    };

    tracing::info!(bind = %addr, to = %cfg.to, "contact-relay listening");

    let mailer = ResendMailer::new(cfg.api_url.clone(), cfg.api_key.clone());
    let app = relay::app(cfg, mailer);
    if let Err(err) = axum::serve(listener, app).await {
        eprintln!("contact-relay server error: {err}");
        std::process::exit(1);
    }
}
