use clap::Parser;
use tracing::{error, info};
use tubehouse::cli::{Args, build_config, init_logging, load_secret, open_database, token_settings};
use tubehouse::run_server;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(access_secret) = load_secret(
        "ACCESS_TOKEN_SECRET",
        args.access_token_secret_file.as_deref(),
    ) else {
        std::process::exit(1);
    };

    let Some(refresh_secret) = load_secret(
        "REFRESH_TOKEN_SECRET",
        args.refresh_token_secret_file.as_deref(),
    ) else {
        std::process::exit(1);
    };

    let Some(tokens) = token_settings(
        access_secret,
        refresh_secret,
        args.access_token_expiry,
        args.refresh_token_expiry,
    ) else {
        std::process::exit(1);
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let config = build_config(db, tokens, args.insecure_cookies, args.media_base_url);

    match listener.local_addr() {
        Ok(local_addr) => info!(address = %local_addr, "Listening"),
        Err(_) => info!(address = %addr, "Listening"),
    }

    if let Err(e) = run_server(config, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
