use soroban_sdk::{
    contract, contractevent, contractimpl, contracttype, panic_with_error, symbol_short, Address,
    BytesN, Env, Map, Symbol, Vec,
};

use crate::error::Error;
use crate::{Asset, PriceData, PriceSource, SCALAR_7};

const ADMIN_KEY: Symbol = symbol_short!("ADMIN");
const STORAGE: Symbol = symbol_short!("STORAGE");

/// Bounded feed history kept per asset.
const MAX_PRICE_HISTORY: u32 = 1000;

// TTL constants (~1 day threshold, ~30 days bump at ~5 sec/ledger)
const INSTANCE_LIFETIME_THRESHOLD: u32 = 17_280;
const INSTANCE_BUMP_AMOUNT: u32 = 518_400;
const PERSISTENT_LIFETIME_THRESHOLD: u32 = 17_280;
const PERSISTENT_BUMP_AMOUNT: u32 = 518_400;

// Timestamp drift tolerance for posted observations
const MAX_TIMESTAMP_DRIFT_SECONDS: u64 = 300;

/// Observations older than this are served with `Cached` provenance.
const DEFAULT_PRICE_TTL: u64 = 60;

/// Fallback quotes used until the relayer posts a first observation.
const DEFAULT_XEC_PRICE: i128 = 300; // 0.00003 USD
const FIRMA_PEG: i128 = SCALAR_7; // 1.0 USD

#[contracttype]
#[derive(Clone, Debug)]
pub struct OracleStorage {
    /// Address allowed to post feed observations.
    feeder: Address,
    /// Per-asset fallback quotes.
    defaults: Map<Asset, i128>,
    /// Freshness window in seconds.
    price_ttl: u64,
    /// Timestamp of the newest accepted observation.
    last_timestamp: u64,
}

impl OracleStorage {
    pub fn get_state(env: &Env) -> OracleStorage {
        env.storage()
            .instance()
            .get(&STORAGE)
            .unwrap_or_else(|| panic_with_error!(env, Error::NotInitialized))
    }

    pub fn set_state(env: &Env, storage: &OracleStorage) {
        env.storage().instance().set(&STORAGE, storage);
    }
}

#[contracttype]
enum DataKey {
    Prices(Asset),
}

#[contractevent]
pub struct PriceUpdateEvent {
    pub asset: Asset,
    pub price: i128,
    pub timestamp: u64,
}

#[contract]
pub struct PriceOracle;

#[contractimpl]
impl PriceOracle {
    pub fn __constructor(env: &Env, admin: Address, feeder: Address) -> Result<(), Error> {
        env.storage().instance().set(&ADMIN_KEY, &admin);

        let mut defaults = Map::new(env);
        defaults.set(Asset::Xec, DEFAULT_XEC_PRICE);
        defaults.set(Asset::Xecx, DEFAULT_XEC_PRICE);
        defaults.set(Asset::Firma, FIRMA_PEG);

        let state = OracleStorage {
            feeder,
            defaults,
            price_ttl: DEFAULT_PRICE_TTL,
            last_timestamp: 0,
        };
        OracleStorage::set_state(env, &state);

        // XEC carries the only feed series; XECX shadows it and FIRMA is pegged.
        let history: Map<u64, i128> = Map::new(env);
        env.storage()
            .persistent()
            .set(&DataKey::Prices(Asset::Xec), &history);
        Ok(())
    }

    fn require_admin(env: &Env) {
        let admin: Address = env
            .storage()
            .instance()
            .get(&ADMIN_KEY)
            .unwrap_or_else(|| panic_with_error!(env, Error::NotInitialized));
        admin.require_auth();
    }

    /// Upgrade the contract to new wasm
    pub fn upgrade(env: &Env, new_wasm_hash: BytesN<32>) {
        Self::require_admin(env);
        env.deployer().update_current_contract_wasm(new_wasm_hash);
    }

    // ==================== Feed Functions ====================

    /// Post a feed observation. Only the feed relayer may call this.
    ///
    /// FIRMA never takes observations (hard peg) and XECX shadows the XEC
    /// series. A zero price is accepted: a worthless collateral asset must
    /// be visible to the risk loop as such.
    pub fn set_price(env: &Env, asset: Asset, price: i128, timestamp: u64) -> Result<(), Error> {
        let state = OracleStorage::get_state(env);
        state.feeder.require_auth();

        match asset {
            Asset::Firma => return Err(Error::PeggedAsset),
            Asset::Xecx => return Err(Error::ShadowedAsset),
            Asset::Xec => {}
        }
        if price < 0 {
            return Err(Error::InvalidPrice);
        }

        let current_time = env.ledger().timestamp();
        if timestamp > current_time + MAX_TIMESTAMP_DRIFT_SECONDS {
            return Err(Error::TimestampInFuture);
        }
        if timestamp <= state.last_timestamp {
            return Err(Error::TimestampTooOld);
        }

        let mut history = Self::price_series(env, &asset).unwrap_or_else(|| Map::new(env));
        while history.len() >= MAX_PRICE_HISTORY {
            if let Some(oldest_key) = history.keys().iter().next() {
                history.remove(oldest_key);
            } else {
                break;
            }
        }
        history.set(timestamp, price);
        env.storage()
            .persistent()
            .set(&DataKey::Prices(asset.clone()), &history);

        let mut state = state;
        state.last_timestamp = timestamp;
        OracleStorage::set_state(env, &state);

        Self::extend_instance_ttl(env);
        Self::extend_persistent_ttl(env, &DataKey::Prices(asset.clone()));

        PriceUpdateEvent {
            asset,
            price,
            timestamp,
        }
        .publish(env);
        Ok(())
    }

    /// Replace the fallback quote used when no observation is on record.
    pub fn set_default_price(env: &Env, asset: Asset, price: i128) -> Result<(), Error> {
        Self::require_admin(env);
        if asset == Asset::Firma {
            return Err(Error::PeggedAsset);
        }
        if price < 0 {
            return Err(Error::InvalidPrice);
        }
        let mut state = OracleStorage::get_state(env);
        state.defaults.set(asset, price);
        OracleStorage::set_state(env, &state);
        Ok(())
    }

    /// Set the freshness window in seconds.
    pub fn set_price_ttl(env: &Env, seconds: u64) {
        Self::require_admin(env);
        let mut state = OracleStorage::get_state(env);
        state.price_ttl = seconds;
        OracleStorage::set_state(env, &state);
    }

    // ==================== Query Functions ====================

    /// USD price for an asset, 7 decimals. Never fails: falls through
    /// feed -> cached observation -> configured default.
    pub fn get_price(env: &Env, asset: Asset) -> i128 {
        Self::resolve(env, &asset).price
    }

    /// Price plus provenance and observation timestamp.
    pub fn price_info(env: &Env, asset: Asset) -> PriceData {
        Self::resolve(env, &asset)
    }

    /// Snapshot of every tracked asset, consumed by the lending engine at
    /// the start of each valuation and by tick broadcasts.
    pub fn prices(env: &Env) -> Map<Asset, PriceData> {
        let mut out = Map::new(env);
        out.set(Asset::Xec, Self::resolve(env, &Asset::Xec));
        out.set(Asset::Firma, Self::resolve(env, &Asset::Firma));
        out.set(Asset::Xecx, Self::resolve(env, &Asset::Xecx));
        out
    }

    /// `amount * price(asset)`, both sides 7 decimals.
    pub fn to_usd(env: &Env, asset: Asset, amount: i128) -> i128 {
        let price = Self::resolve(env, &asset).price;
        amount * price / SCALAR_7
    }

    /// `usd / price(asset)`; 0 when the asset is worthless.
    pub fn from_usd(env: &Env, asset: Asset, usd: i128) -> i128 {
        let price = Self::resolve(env, &asset).price;
        if price == 0 {
            return 0;
        }
        usd * SCALAR_7 / price
    }

    /// Newest raw observation of the asset's feed series, if any.
    pub fn lastprice(env: &Env, asset: Asset) -> Option<PriceData> {
        let series = Self::price_series(env, &Self::series_asset(&asset)?)?;
        let timestamp = series.keys().last()?;
        let price = series.get(timestamp)?;
        Some(PriceData {
            price,
            timestamp,
            source: PriceSource::Feed,
        })
    }

    /// Up to `records` most recent observations, newest first.
    pub fn price_history(env: &Env, asset: Asset, records: u32) -> Vec<PriceData> {
        let mut prices = Vec::new(env);
        let Some(series_asset) = Self::series_asset(&asset) else {
            return prices;
        };
        let Some(series) = Self::price_series(env, &series_asset) else {
            return prices;
        };
        series
            .keys()
            .iter()
            .rev()
            .take(records as usize)
            .for_each(|timestamp| {
                prices.push_back(PriceData {
                    price: series.get_unchecked(timestamp),
                    timestamp,
                    source: PriceSource::Feed,
                })
            });
        prices
    }

    /// The configured freshness window in seconds.
    pub fn price_ttl(env: &Env) -> u64 {
        OracleStorage::get_state(env).price_ttl
    }

    // ==================== Internal Helpers ====================

    /// Feed series backing an asset: XECX reads through XEC, FIRMA has none.
    fn series_asset(asset: &Asset) -> Option<Asset> {
        match asset {
            Asset::Firma => None,
            Asset::Xec | Asset::Xecx => Some(Asset::Xec),
        }
    }

    fn resolve(env: &Env, asset: &Asset) -> PriceData {
        if *asset == Asset::Firma {
            return PriceData {
                price: FIRMA_PEG,
                timestamp: env.ledger().timestamp(),
                source: PriceSource::Pegged,
            };
        }

        let state = OracleStorage::get_state(env);
        let series = Self::series_asset(asset).and_then(|s| Self::price_series(env, &s));
        if let Some(series) = series {
            if let Some(timestamp) = series.keys().last() {
                let price = series.get_unchecked(timestamp);
                let now = env.ledger().timestamp();
                let source = if now.saturating_sub(timestamp) < state.price_ttl {
                    PriceSource::Feed
                } else {
                    PriceSource::Cached
                };
                return PriceData {
                    price,
                    timestamp,
                    source,
                };
            }
        }

        PriceData {
            price: state.defaults.get(asset.clone()).unwrap_or(0),
            timestamp: env.ledger().timestamp(),
            source: PriceSource::Default,
        }
    }

    fn price_series(env: &Env, asset: &Asset) -> Option<Map<u64, i128>> {
        env.storage().persistent().get(&DataKey::Prices(asset.clone()))
    }

    fn extend_instance_ttl(env: &Env) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
    }

    fn extend_persistent_ttl(env: &Env, key: &DataKey) {
        env.storage()
            .persistent()
            .extend_ttl(key, PERSISTENT_LIFETIME_THRESHOLD, PERSISTENT_BUMP_AMOUNT);
    }
}
