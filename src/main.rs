//!
//! svboard server binary
//! ---------------------
//! Starts the student council site. Configuration comes from the environment; CLI flags
//! override individual values.

use anyhow::Result;
use tracing::info;

use svboard::config::{flag_value, has_flag, init_tracing, Config};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let args: Vec<String> = std::env::args().collect();
    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("svboard\n\nUSAGE:\n  svboard [--http-port N] [--data-folder PATH]\n\nOPTIONS:\n  --http-port N        HTTP port (env: SV_HTTP_PORT, default 3000)\n  --data-folder PATH   Store and local blob folder (env: SV_DATA_FOLDER, default data)\n\nENV:\n  JWT_SECRET (required), OWNER_EMAIL, OWNER_PASSWORD, BLOB_READ_WRITE_TOKEN, SV_ENV=production\n");
        return Ok(());
    }

    let mut cfg = Config::from_env();
    if let Some(port) = flag_value(&args, "--http-port").and_then(|v| v.parse::<u16>().ok()) {
        cfg.http_port = port;
    }
    if let Some(folder) = flag_value(&args, "--data-folder") {
        cfg.data_folder = folder;
    }

    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(target: "svboard", "svboard starting: RUST_LOG='{}', http_port={}, data_folder='{}'", rust_log, cfg.http_port, cfg.data_folder);

    svboard::server::run(cfg).await
}
