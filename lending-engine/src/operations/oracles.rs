use soroban_sdk::Env;

use crate::common::storage::Storage;
use crate::common::types::PriceSnapshot;
use price_oracle::{Asset, PriceOracleClient};

/// Oracle integration. The snapshot is taken once at the start of an
/// invocation, before any state is written, and passed through every
/// valuation (no price read mid-mutation).
pub struct Oracles;

impl Oracles {
    pub fn snapshot(env: &Env) -> PriceSnapshot {
        let storage = Storage::get(env);
        let client = PriceOracleClient::new(env, &storage.oracle);
        let quotes = client.prices();

        let quote = |asset: Asset| quotes.get(asset).map(|p| p.price).unwrap_or(0);
        PriceSnapshot {
            xec: quote(Asset::Xec),
            firma: quote(Asset::Firma),
            xecx: quote(Asset::Xecx),
        }
    }
}
