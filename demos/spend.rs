use std::env;
use std::fs;

use log::{error, info};

use libmultisig::config::SpendConfig;
use libmultisig::spend;

fn main() {
    env_logger::init();

    let path = env::args()
        .nth(1)
        .unwrap_or_else(|| "demos/spend.json".to_string());
    let config = match SpendConfig::from_file(&path) {
        Ok(config) => config,
        Err(e) => {
            error!("cannot load {}: {}", path, e);
            std::process::exit(1);
        }
    };

    let outcome = match spend::run(&config) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("spend failed: {}", e);
            std::process::exit(1);
        }
    };

    info!("redeem script: {}", outcome.redeem_script);
    info!("address: {}", outcome.address);
    info!("txid: {}", outcome.transaction.txid());
    info!("wtxid: {}", outcome.transaction.wtxid());

    if let Err(e) = fs::write(&config.output, outcome.transaction.to_hex()) {
        error!("cannot write {}: {}", config.output.display(), e);
        std::process::exit(1);
    }
    info!("written to {}", config.output.display());
}
