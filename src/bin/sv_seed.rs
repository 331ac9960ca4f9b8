//!
//! sv_seed binary
//! --------------
//! Creates the owner admin from OWNER_EMAIL / OWNER_PASSWORD in the data folder store.
//! An existing user with that email is left untouched.

use anyhow::{anyhow, Result};
use tracing::info;

use svboard::config::{flag_value, init_tracing, Config};
use svboard::security::ensure_owner_admin;
use svboard::storage::JsonStore;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let args: Vec<String> = std::env::args().collect();
    let mut cfg = Config::from_env();
    if let Some(folder) = flag_value(&args, "--data-folder") {
        cfg.data_folder = folder;
    }
    let (email, password) = cfg
        .owner_credentials()
        .ok_or_else(|| anyhow!("OWNER_EMAIL and OWNER_PASSWORD must be set"))?;

    let store = JsonStore::open(&cfg.data_folder)?;
    if ensure_owner_admin(&store, email, password).await? {
        info!(target: "seed", "owner {} created in {}", email, cfg.data_folder);
    } else {
        info!(target: "seed", "owner {} already exists", email);
    }
    Ok(())
}
