//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store`
//! trait. Compound operations follow one shape: acquire the advisory lock
//! for every party whose balance may move, re-read state, run the engine
//! rules, and commit a single `WriteBatch`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use rcn_core::{
    home_shop, reward_for_repair, verify_redemption, Address, Balances, CapacityGuard, Customer,
    EarningCaps, EngineError, PromoCode, PromoId, RedemptionCheck, RedemptionSession,
    ReferralReward, SessionId, Shop, ShopId, SourceEntry, Transaction, TransactionId, TxMetadata,
    TxStatus, DEFAULT_SESSION_TTL_SECONDS,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::ops::{
    CreditOutcome, GiftCredit, MarketCredit, PromoApplication, PromoOutcome, RedemptionOutcome,
    ReferralCompletion, ReferralOutcome, RepairCredit, RepairOutcome,
};
use crate::schema::{all_column_families, cf};
use crate::Store;

/// Lock-key namespace tags, so customer and promo locks never collide.
const LOCK_CUSTOMER: u8 = b'c';
const LOCK_PROMO: u8 = b'p';

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    guard: CapacityGuard,
    session_ttl: Duration,
    locks: Mutex<HashMap<Vec<u8>, Arc<Mutex<()>>>>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path with default
    /// caps and session TTL.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(
            path,
            EarningCaps::default(),
            Duration::seconds(DEFAULT_SESSION_TTL_SECONDS),
        )
    }

    /// Open with explicit earning caps and session TTL.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open_with<P: AsRef<Path>>(
        path: P,
        caps: EarningCaps,
        session_ttl: Duration,
    ) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            guard: CapacityGuard::new(caps),
            session_ttl,
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Read and deserialize one value.
    fn get_value<T: serde::de::DeserializeOwned>(
        &self,
        cf_name: &str,
        key: &[u8],
    ) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Serialize and stage one value into a batch.
    fn stage_value<T: serde::Serialize>(
        &self,
        batch: &mut WriteBatch,
        cf_name: &str,
        key: &[u8],
        value: &T,
    ) -> Result<()> {
        let cf = self.cf(cf_name)?;
        batch.put_cf(&cf, key, Self::serialize(value)?);
        Ok(())
    }

    /// Commit a batch.
    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Collect all key/value pairs under a prefix.
    fn scan_prefix(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<(Box<[u8]>, Box<[u8]>)>> {
        let cf = self.cf(cf_name)?;
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward));

        let mut pairs = Vec::new();
        for item in iter {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            pairs.push((key, value));
        }
        Ok(pairs)
    }

    /// The advisory lock for a key, created on first use.
    fn lock_handle(&self, tag: u8, raw: &[u8]) -> Arc<Mutex<()>> {
        let mut key = Vec::with_capacity(raw.len() + 1);
        key.push(tag);
        key.extend_from_slice(raw);

        let mut map = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        map.entry(key).or_default().clone()
    }

    fn customer_lock(&self, address: &Address) -> Arc<Mutex<()>> {
        self.lock_handle(LOCK_CUSTOMER, address.as_bytes())
    }

    fn promo_lock(&self, promo_id: &PromoId) -> Arc<Mutex<()>> {
        self.lock_handle(LOCK_PROMO, promo_id.as_bytes())
    }

    // =========================================================================
    // Internal Reads
    // =========================================================================

    /// Load a customer or fail `NotFound`.
    fn require_customer(&self, address: &Address) -> Result<Customer> {
        self.get_value::<Customer>(cf::CUSTOMERS, &keys::customer_key(address))?
            .ok_or_else(|| EngineError::customer_not_found(address.to_string()).into())
    }

    /// Load an active customer or fail.
    fn require_active_customer(&self, address: &Address) -> Result<Customer> {
        let customer = self.require_customer(address)?;
        if !customer.is_active {
            return Err(EngineError::Validation(format!(
                "customer {address} is deactivated"
            ))
            .into());
        }
        Ok(customer)
    }

    /// Load a shop or fail `NotFound`.
    fn require_shop(&self, shop_id: &ShopId) -> Result<Shop> {
        self.get_value::<Shop>(cf::SHOPS, &keys::shop_key(shop_id))?
            .ok_or_else(|| EngineError::shop_not_found(shop_id.to_string()).into())
    }

    /// All source entries for a customer, in commit (ULID) order.
    fn customer_sources(&self, address: &Address) -> Result<Vec<SourceEntry>> {
        let pairs = self.scan_prefix(cf::SOURCES_BY_CUSTOMER, &keys::customer_prefix(address))?;

        let mut entries = Vec::with_capacity(pairs.len());
        for (key, _) in pairs {
            let tx_id = keys::extract_transaction_id(&key);
            if let Some(entry) =
                self.get_value::<SourceEntry>(cf::SOURCES, &keys::source_key(&tx_id))?
            {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    /// Sum of redemption debits for a customer (failed settlements excluded).
    fn redeemed_total(&self, address: &Address) -> Result<i64> {
        let pairs =
            self.scan_prefix(cf::TRANSACTIONS_BY_CUSTOMER, &keys::customer_prefix(address))?;

        let mut total = 0;
        for (key, _) in pairs {
            let tx_id = keys::extract_transaction_id(&key);
            if let Some(tx) =
                self.get_value::<Transaction>(cf::TRANSACTIONS, &keys::transaction_key(&tx_id))?
            {
                if tx.is_debit() && tx.status != TxStatus::Failed {
                    total += tx.amount;
                }
            }
        }
        Ok(total)
    }

    /// Earned balance derived from the ledger.
    fn earned_balance(&self, address: &Address) -> Result<i64> {
        let sources = self.customer_sources(address)?;
        let redeemed = self.redeemed_total(address)?;
        Ok(rcn_core::source::redeemable_credit_total(&sources) - redeemed)
    }

    // =========================================================================
    // Internal Staging
    // =========================================================================

    /// Stage a source entry and its customer index.
    fn stage_source(&self, batch: &mut WriteBatch, entry: &SourceEntry) -> Result<()> {
        self.stage_value(
            batch,
            cf::SOURCES,
            &keys::source_key(&entry.transaction_id),
            entry,
        )?;
        let cf_index = self.cf(cf::SOURCES_BY_CUSTOMER)?;
        batch.put_cf(
            &cf_index,
            keys::customer_source_key(&entry.customer, &entry.transaction_id),
            [],
        );
        Ok(())
    }

    /// Stage a transaction and its customer index.
    fn stage_transaction(&self, batch: &mut WriteBatch, tx: &Transaction) -> Result<()> {
        self.stage_value(batch, cf::TRANSACTIONS, &keys::transaction_key(&tx.id), tx)?;
        let cf_index = self.cf(cf::TRANSACTIONS_BY_CUSTOMER)?;
        batch.put_cf(
            &cf_index,
            keys::customer_transaction_key(&tx.customer, &tx.id),
            [],
        );
        Ok(())
    }

    /// Stage a customer record.
    fn stage_customer(&self, batch: &mut WriteBatch, customer: &Customer) -> Result<()> {
        self.stage_value(
            batch,
            cf::CUSTOMERS,
            &keys::customer_key(&customer.address),
            customer,
        )
    }

    /// Stage a session record.
    fn stage_session(&self, batch: &mut WriteBatch, session: &RedemptionSession) -> Result<()> {
        self.stage_value(batch, cf::SESSIONS, &keys::session_key(&session.id), session)
    }

    /// Recompute and cache the home-shop projection after staged credits.
    ///
    /// `extra` holds entries staged in the current batch but not yet
    /// visible to a scan.
    fn refresh_home_shop(&self, customer: &mut Customer, extra: &[SourceEntry]) -> Result<()> {
        let mut entries = self.customer_sources(&customer.address)?;
        entries.extend_from_slice(extra);
        customer.home_shop_id = home_shop(&entries);
        Ok(())
    }

    /// Verifier snapshot against current ledger state, shared by the read
    /// path, session creation, and the use-time re-check.
    fn verify_snapshot(
        &self,
        customer: &Address,
        shop_id: &ShopId,
        requested: i64,
    ) -> Result<RedemptionCheck> {
        self.require_active_customer(customer)?;
        let shop = self.require_shop(shop_id)?;

        let sources = self.customer_sources(customer)?;
        let redeemed = self.redeemed_total(customer)?;
        let earned = rcn_core::source::redeemable_credit_total(&sources) - redeemed;
        let home = home_shop(&sources);

        Ok(verify_redemption(&shop, home.as_ref(), earned, requested)?)
    }

    /// Load a session or fail `NotFound`.
    fn require_session(&self, session_id: &SessionId) -> Result<RedemptionSession> {
        self.get_value::<RedemptionSession>(cf::SESSIONS, &keys::session_key(session_id))?
            .ok_or_else(|| EngineError::session_not_found(session_id.to_string()).into())
    }

    /// Persist a lapsed pending session as expired and return the expiry
    /// error the caller should surface.
    fn sweep_lapsed(&self, mut session: RedemptionSession) -> Result<StoreError> {
        let id = session.id;
        let expires_at = session.expires_at;
        session.expire()?;
        let mut batch = WriteBatch::default();
        self.stage_session(&mut batch, &session)?;
        self.write(batch)?;
        Ok(EngineError::Expired(format!("session {id} expired at {expires_at}")).into())
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Customer & Shop Records
    // =========================================================================

    fn put_customer(&self, customer: &Customer) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.stage_customer(&mut batch, customer)?;
        self.write(batch)
    }

    fn get_customer(&self, address: &Address) -> Result<Option<Customer>> {
        self.get_value(cf::CUSTOMERS, &keys::customer_key(address))
    }

    fn put_shop(&self, shop: &Shop) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.stage_value(&mut batch, cf::SHOPS, &keys::shop_key(&shop.id), shop)?;
        self.write(batch)
    }

    fn get_shop(&self, shop_id: &ShopId) -> Result<Option<Shop>> {
        self.get_value(cf::SHOPS, &keys::shop_key(shop_id))
    }

    // =========================================================================
    // Ledger Reads
    // =========================================================================

    fn list_sources(&self, address: &Address) -> Result<Vec<SourceEntry>> {
        self.customer_sources(address)
    }

    fn list_transactions(
        &self,
        address: &Address,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Transaction>> {
        let pairs =
            self.scan_prefix(cf::TRANSACTIONS_BY_CUSTOMER, &keys::customer_prefix(address))?;

        // ULID keys scan oldest-first; newest first for the caller.
        let mut transactions = Vec::new();
        for (key, _) in pairs.into_iter().rev().skip(offset) {
            if transactions.len() >= limit {
                break;
            }
            let tx_id = keys::extract_transaction_id(&key);
            if let Some(tx) =
                self.get_value::<Transaction>(cf::TRANSACTIONS, &keys::transaction_key(&tx_id))?
            {
                transactions.push(tx);
            }
        }
        Ok(transactions)
    }

    fn balances(&self, address: &Address) -> Result<Balances> {
        self.require_customer(address)?;

        let sources = self.customer_sources(address)?;
        let redeemed = self.redeemed_total(address)?;

        let lifetime = rcn_core::source::credit_total(&sources);
        let earned = rcn_core::source::redeemable_credit_total(&sources) - redeemed;
        let total = lifetime - redeemed;

        Ok(Balances {
            lifetime_earnings: lifetime,
            total,
            earned,
            market: total - earned,
        })
    }

    fn home_shop(&self, address: &Address) -> Result<Option<ShopId>> {
        let sources = self.customer_sources(address)?;
        Ok(home_shop(&sources))
    }

    // =========================================================================
    // Guarded Credits
    // =========================================================================

    fn record_repair(&self, credit: &RepairCredit, now: DateTime<Utc>) -> Result<RepairOutcome> {
        let lock = self.customer_lock(&credit.customer);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut customer = self.require_active_customer(&credit.customer)?;
        let shop = self.require_shop(&credit.shop_id)?;
        shop.ensure_operational()?;

        // Idempotent replay: reconstruct the original outcome.
        if let Some(entry) = self
            .get_value::<SourceEntry>(cf::SOURCES, &keys::source_key(&credit.transaction_id))?
        {
            let (old_tier, new_tier) = match self.get_value::<Transaction>(
                cf::TRANSACTIONS,
                &keys::transaction_key(&credit.transaction_id),
            )? {
                Some(Transaction {
                    metadata: TxMetadata::Repair {
                        old_tier, new_tier, ..
                    },
                    ..
                }) => (old_tier, new_tier),
                _ => (customer.tier, customer.tier),
            };
            let tier_bonus = old_tier.repair_bonus();
            return Ok(RepairOutcome {
                base_reward: entry.amount,
                tier_bonus,
                old_tier,
                new_tier,
                total_credited: entry.amount + tier_bonus,
                already_recorded: true,
            });
        }

        let base_reward = reward_for_repair(credit.repair_amount_cents)?;
        let old_tier = customer.tier;
        let tier_bonus = old_tier.repair_bonus();
        let total = base_reward + tier_bonus;

        self.guard.check(&customer, total, now)?;
        self.guard.record(&mut customer, total, now);
        customer.apply_credit(total, now);
        let new_tier = customer.tier;

        let repair_entry = SourceEntry::repair(
            credit.customer.clone(),
            credit.shop_id,
            base_reward,
            credit.transaction_id,
            now,
        );
        let bonus_entry = SourceEntry::tier_bonus(
            credit.customer.clone(),
            credit.shop_id,
            tier_bonus,
            TransactionId::generate(),
            now,
        );

        self.refresh_home_shop(
            &mut customer,
            &[repair_entry.clone(), bonus_entry.clone()],
        )?;

        let repair_tx = Transaction::mint(
            credit.transaction_id,
            credit.customer.clone(),
            Some(credit.shop_id),
            base_reward,
            TxMetadata::Repair {
                repair_amount_cents: credit.repair_amount_cents,
                old_tier,
                new_tier,
            },
            now,
        );
        let bonus_tx = Transaction::mint(
            bonus_entry.transaction_id,
            credit.customer.clone(),
            Some(credit.shop_id),
            tier_bonus,
            TxMetadata::TierBonus { tier: old_tier },
            now,
        );

        let mut batch = WriteBatch::default();
        self.stage_customer(&mut batch, &customer)?;
        self.stage_source(&mut batch, &repair_entry)?;
        self.stage_source(&mut batch, &bonus_entry)?;
        self.stage_transaction(&mut batch, &repair_tx)?;
        self.stage_transaction(&mut batch, &bonus_tx)?;
        self.write(batch)?;

        Ok(RepairOutcome {
            base_reward,
            tier_bonus,
            old_tier,
            new_tier,
            total_credited: total,
            already_recorded: false,
        })
    }

    fn record_gift(&self, credit: &GiftCredit, now: DateTime<Utc>) -> Result<CreditOutcome> {
        let lock = self.customer_lock(&credit.to);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut customer = self.require_active_customer(&credit.to)?;

        if let Some(entry) = self
            .get_value::<SourceEntry>(cf::SOURCES, &keys::source_key(&credit.transaction_id))?
        {
            return Ok(CreditOutcome {
                amount: entry.amount,
                already_recorded: true,
            });
        }

        if credit.amount <= 0 {
            return Err(EngineError::Validation(format!(
                "gift amount must be positive, got {}",
                credit.amount
            ))
            .into());
        }

        // Gifts are acquisitions, not earnings: no capacity guard, no
        // home-shop standing. They still raise lifetime totals.
        customer.apply_credit(credit.amount, now);

        let entry = SourceEntry::gift(
            credit.to.clone(),
            credit.amount,
            credit.transaction_id,
            now,
        );
        let tx = Transaction::mint(
            credit.transaction_id,
            credit.to.clone(),
            None,
            credit.amount,
            TxMetadata::Gift {
                from: credit.from.clone(),
            },
            now,
        );

        let mut batch = WriteBatch::default();
        self.stage_customer(&mut batch, &customer)?;
        self.stage_source(&mut batch, &entry)?;
        self.stage_transaction(&mut batch, &tx)?;
        self.write(batch)?;

        Ok(CreditOutcome {
            amount: credit.amount,
            already_recorded: false,
        })
    }

    fn record_market_purchase(
        &self,
        credit: &MarketCredit,
        now: DateTime<Utc>,
    ) -> Result<CreditOutcome> {
        let lock = self.customer_lock(&credit.customer);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut customer = self.require_active_customer(&credit.customer)?;

        if let Some(entry) = self
            .get_value::<SourceEntry>(cf::SOURCES, &keys::source_key(&credit.transaction_id))?
        {
            return Ok(CreditOutcome {
                amount: entry.amount,
                already_recorded: true,
            });
        }

        if credit.amount <= 0 {
            return Err(EngineError::Validation(format!(
                "purchase amount must be positive, got {}",
                credit.amount
            ))
            .into());
        }

        customer.apply_credit(credit.amount, now);

        let entry = SourceEntry::market_purchase(
            credit.customer.clone(),
            credit.amount,
            credit.transaction_id,
            now,
        );
        let tx = Transaction::mint(
            credit.transaction_id,
            credit.customer.clone(),
            None,
            credit.amount,
            TxMetadata::MarketPurchase,
            now,
        );

        let mut batch = WriteBatch::default();
        self.stage_customer(&mut batch, &customer)?;
        self.stage_source(&mut batch, &entry)?;
        self.stage_transaction(&mut batch, &tx)?;
        self.write(batch)?;

        Ok(CreditOutcome {
            amount: credit.amount,
            already_recorded: false,
        })
    }

    fn complete_referral(
        &self,
        completion: &ReferralCompletion,
        now: DateTime<Utc>,
    ) -> Result<ReferralOutcome> {
        if completion.referrer == completion.referee {
            return Err(EngineError::Validation(
                "a customer cannot refer themselves".into(),
            )
            .into());
        }

        // Lock both parties in address order so two overlapping referrals
        // between the same pair cannot deadlock.
        let (first, second) = if completion.referrer <= completion.referee {
            (&completion.referrer, &completion.referee)
        } else {
            (&completion.referee, &completion.referrer)
        };
        let lock_a = self.customer_lock(first);
        let _guard_a = lock_a.lock().unwrap_or_else(PoisonError::into_inner);
        let lock_b = self.customer_lock(second);
        let _guard_b = lock_b.lock().unwrap_or_else(PoisonError::into_inner);

        let reward = ReferralReward::default();

        if self
            .get_value::<SourceEntry>(cf::SOURCES, &keys::source_key(&completion.transaction_id))?
            .is_some()
        {
            return Ok(ReferralOutcome {
                reward,
                already_recorded: true,
            });
        }

        let mut referrer = self.require_active_customer(&completion.referrer)?;
        let mut referee = self.require_active_customer(&completion.referee)?;

        // Both sides must clear their caps before either credit commits.
        self.guard.check(&referrer, reward.referrer_tokens, now)?;
        self.guard.check(&referee, reward.referee_tokens, now)?;

        self.guard.record(&mut referrer, reward.referrer_tokens, now);
        referrer.apply_credit(reward.referrer_tokens, now);
        self.guard.record(&mut referee, reward.referee_tokens, now);
        referee.apply_credit(reward.referee_tokens, now);

        let referrer_entry = SourceEntry::referral_bonus(
            completion.referrer.clone(),
            reward.referrer_tokens,
            completion.transaction_id,
            now,
        );
        let referee_entry = SourceEntry::referral_bonus(
            completion.referee.clone(),
            reward.referee_tokens,
            TransactionId::generate(),
            now,
        );

        let metadata = TxMetadata::Referral {
            referrer: completion.referrer.clone(),
            referee: completion.referee.clone(),
            referrer_tokens: reward.referrer_tokens,
            referee_tokens: reward.referee_tokens,
        };
        let referrer_tx = Transaction::mint(
            referrer_entry.transaction_id,
            completion.referrer.clone(),
            None,
            reward.referrer_tokens,
            metadata.clone(),
            now,
        );
        let referee_tx = Transaction::mint(
            referee_entry.transaction_id,
            completion.referee.clone(),
            None,
            reward.referee_tokens,
            metadata,
            now,
        );

        let mut batch = WriteBatch::default();
        self.stage_customer(&mut batch, &referrer)?;
        self.stage_customer(&mut batch, &referee)?;
        self.stage_source(&mut batch, &referrer_entry)?;
        self.stage_source(&mut batch, &referee_entry)?;
        self.stage_transaction(&mut batch, &referrer_tx)?;
        self.stage_transaction(&mut batch, &referee_tx)?;
        self.write(batch)?;

        Ok(ReferralOutcome {
            reward,
            already_recorded: false,
        })
    }

    // =========================================================================
    // Promo Codes
    // =========================================================================

    fn create_promo(&self, promo: &PromoCode) -> Result<()> {
        let code_key = keys::promo_code_key(&promo.shop_id, &promo.code);
        let cf_index = self.cf(cf::PROMOS_BY_SHOP_CODE)?;

        if self
            .db
            .get_cf(&cf_index, &code_key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_some()
        {
            return Err(EngineError::Conflict(format!(
                "shop {} already has a promo code {}",
                promo.shop_id, promo.code
            ))
            .into());
        }

        let mut batch = WriteBatch::default();
        self.stage_value(&mut batch, cf::PROMOS, &keys::promo_key(&promo.id), promo)?;
        batch.put_cf(&cf_index, code_key, promo.id.as_bytes());
        self.write(batch)
    }

    fn get_promo(&self, shop_id: &ShopId, code: &str) -> Result<Option<PromoCode>> {
        let cf_index = self.cf(cf::PROMOS_BY_SHOP_CODE)?;
        let Some(id_bytes) = self
            .db
            .get_cf(&cf_index, keys::promo_code_key(shop_id, code))
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        let mut bytes = [0u8; 16];
        if id_bytes.len() != 16 {
            return Err(StoreError::Serialization("malformed promo index entry".into()));
        }
        bytes.copy_from_slice(&id_bytes);
        let promo_id = PromoId::from_bytes(bytes);

        self.get_value(cf::PROMOS, &keys::promo_key(&promo_id))
    }

    fn promo_use_count(&self, promo_id: &PromoId, customer: &Address) -> Result<u32> {
        let pairs = self.scan_prefix(
            cf::PROMO_USES,
            &keys::promo_customer_prefix(promo_id, customer),
        )?;
        Ok(u32::try_from(pairs.len()).unwrap_or(u32::MAX))
    }

    fn apply_promo(
        &self,
        application: &PromoApplication,
        now: DateTime<Utc>,
    ) -> Result<PromoOutcome> {
        let Some(mut promo) = self.get_promo(&application.shop_id, &application.code)? else {
            return Err(EngineError::promo_not_found(application.code.clone()).into());
        };

        // Promo lock before customer lock; no other path takes them in the
        // opposite order.
        let p_lock = self.promo_lock(&promo.id);
        let _p_guard = p_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let c_lock = self.customer_lock(&application.customer);
        let _c_guard = c_lock.lock().unwrap_or_else(PoisonError::into_inner);

        // Re-read the code under the lock; counters may have moved.
        let Some(fresh) = self.get_value::<PromoCode>(cf::PROMOS, &keys::promo_key(&promo.id))?
        else {
            return Err(EngineError::promo_not_found(application.code.clone()).into());
        };
        promo = fresh;

        let mut customer = self.require_active_customer(&application.customer)?;
        let shop = self.require_shop(&application.shop_id)?;
        shop.ensure_operational()?;

        if let Some(entry) = self.get_value::<SourceEntry>(
            cf::SOURCES,
            &keys::source_key(&application.transaction_id),
        )? {
            return Ok(PromoOutcome {
                bonus: entry.amount,
                total_reward: application.base_reward + entry.amount,
                times_used: promo.times_used,
                already_recorded: true,
            });
        }

        if application.base_reward < 0 {
            return Err(EngineError::Validation(format!(
                "base reward must not be negative, got {}",
                application.base_reward
            ))
            .into());
        }

        let uses = self.promo_use_count(&promo.id, &application.customer)?;
        promo.validate(uses, now)?;

        let bonus = promo.bonus_for(application.base_reward);
        if bonus <= 0 {
            return Err(EngineError::Validation(format!(
                "promo code {} yields no bonus for base reward {}",
                promo.code, application.base_reward
            ))
            .into());
        }

        self.guard.check(&customer, bonus, now)?;
        self.guard.record(&mut customer, bonus, now);
        customer.apply_credit(bonus, now);

        promo.record_use(bonus, now);

        let entry = SourceEntry::promotion(
            application.customer.clone(),
            application.shop_id,
            bonus,
            application.transaction_id,
            now,
        );
        self.refresh_home_shop(&mut customer, &[entry.clone()])?;

        let promo_use = rcn_core::PromoUse {
            promo_id: promo.id,
            customer: application.customer.clone(),
            shop_id: application.shop_id,
            base_reward: application.base_reward,
            bonus_amount: bonus,
            total_reward: application.base_reward + bonus,
            used_at: now,
        };

        let tx = Transaction::mint(
            application.transaction_id,
            application.customer.clone(),
            Some(application.shop_id),
            bonus,
            TxMetadata::Promo {
                code: promo.code.clone(),
                base_reward: application.base_reward,
                bonus_amount: bonus,
            },
            now,
        );

        // Use row, counters, source entry, and customer all land in one
        // batch so times_used stays 1:1 with the use rows.
        let mut batch = WriteBatch::default();
        self.stage_value(&mut batch, cf::PROMOS, &keys::promo_key(&promo.id), &promo)?;
        self.stage_value(
            &mut batch,
            cf::PROMO_USES,
            &keys::promo_use_key(&promo.id, &application.customer, &application.transaction_id),
            &promo_use,
        )?;
        self.stage_customer(&mut batch, &customer)?;
        self.stage_source(&mut batch, &entry)?;
        self.stage_transaction(&mut batch, &tx)?;
        self.write(batch)?;

        Ok(PromoOutcome {
            bonus,
            total_reward: application.base_reward + bonus,
            times_used: promo.times_used,
            already_recorded: false,
        })
    }

    // =========================================================================
    // Redemption Verification & Sessions
    // =========================================================================

    fn verify_redemption(
        &self,
        customer: &Address,
        shop_id: &ShopId,
        requested: i64,
    ) -> Result<RedemptionCheck> {
        self.verify_snapshot(customer, shop_id, requested)
    }

    fn create_session(
        &self,
        customer: &Address,
        shop_id: &ShopId,
        requested: i64,
        now: DateTime<Utc>,
    ) -> Result<RedemptionSession> {
        let lock = self.customer_lock(customer);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let check = self.verify_snapshot(customer, shop_id, requested)?;
        if !check.can_redeem {
            return Err(EngineError::LimitExceeded {
                limit: check.max_redeemable,
                requested,
                remaining: check.max_redeemable,
            }
            .into());
        }

        let mut batch = WriteBatch::default();

        // One live pending session per (customer, shop) pair. A lapsed one
        // is swept and replaced in the same write.
        let pair_key = keys::session_pair_key(customer, shop_id);
        let cf_pair = self.cf(cf::SESSIONS_BY_PAIR)?;
        if let Some(id_bytes) = self
            .db
            .get_cf(&cf_pair, &pair_key)
            .map_err(|e| StoreError::Database(e.to_string()))?
        {
            if id_bytes.len() == 16 {
                let mut bytes = [0u8; 16];
                bytes.copy_from_slice(&id_bytes);
                let prior_id = SessionId::from_bytes(bytes);
                if let Some(mut prior) = self.get_session(&prior_id)? {
                    if prior.is_lapsed(now) {
                        prior.expire()?;
                        self.stage_session(&mut batch, &prior)?;
                    } else if prior.status == rcn_core::SessionStatus::Pending {
                        return Err(EngineError::Conflict(format!(
                            "a pending session {prior_id} already exists for this customer and shop"
                        ))
                        .into());
                    }
                }
            }
        }

        let session =
            RedemptionSession::new(customer.clone(), *shop_id, requested, self.session_ttl, now);

        self.stage_session(&mut batch, &session)?;
        batch.put_cf(&cf_pair, pair_key, session.id.as_bytes());
        self.write(batch)?;

        tracing::debug!(
            session_id = %session.id,
            customer = %customer,
            shop_id = %shop_id,
            max_amount = requested,
            "redemption session opened"
        );

        Ok(session)
    }

    fn get_session(&self, session_id: &SessionId) -> Result<Option<RedemptionSession>> {
        self.get_value(cf::SESSIONS, &keys::session_key(session_id))
    }

    fn approve_session(
        &self,
        session_id: &SessionId,
        acting: &Address,
        signature: String,
        now: DateTime<Utc>,
    ) -> Result<RedemptionSession> {
        let session = self.require_session(session_id)?;

        let lock = self.customer_lock(&session.customer);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut session = self.require_session(session_id)?;

        if session.customer != *acting {
            return Err(EngineError::Unauthorized.into());
        }

        if session.is_lapsed(now) {
            return Err(self.sweep_lapsed(session)?);
        }

        session.approve(signature, now)?;

        let mut batch = WriteBatch::default();
        self.stage_session(&mut batch, &session)?;
        self.write(batch)?;

        Ok(session)
    }

    fn reject_session(
        &self,
        session_id: &SessionId,
        acting: &Address,
        now: DateTime<Utc>,
    ) -> Result<RedemptionSession> {
        let session = self.require_session(session_id)?;

        let lock = self.customer_lock(&session.customer);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut session = self.require_session(session_id)?;

        if session.customer != *acting {
            return Err(EngineError::Unauthorized.into());
        }

        if session.is_lapsed(now) {
            return Err(self.sweep_lapsed(session)?);
        }

        session.reject(now)?;

        let mut batch = WriteBatch::default();
        self.stage_session(&mut batch, &session)?;
        self.write(batch)?;

        Ok(session)
    }

    fn use_session(
        &self,
        session_id: &SessionId,
        acting_shop: &ShopId,
        now: DateTime<Utc>,
    ) -> Result<RedemptionOutcome> {
        let session = self.require_session(session_id)?;

        let lock = self.customer_lock(&session.customer);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut session = self.require_session(session_id)?;

        if session.shop_id != *acting_shop {
            return Err(EngineError::Unauthorized.into());
        }

        if session.is_lapsed(now) {
            return Err(self.sweep_lapsed(session)?);
        }

        // Balances can move between approval and use; the snapshot taken at
        // creation is never trusted for the debit.
        let check = self.verify_snapshot(&session.customer, acting_shop, session.max_amount)?;
        if !check.can_redeem {
            return Err(EngineError::LimitExceeded {
                limit: check.max_redeemable,
                requested: session.max_amount,
                remaining: check.max_redeemable,
            }
            .into());
        }

        session.mark_used(now)?;

        let mut customer = self.require_customer(&session.customer)?;
        customer.updated_at = now;

        let debit = Transaction::redeem(
            TransactionId::generate(),
            session.customer.clone(),
            *acting_shop,
            session.max_amount,
            session.id,
            now,
        );

        let mut batch = WriteBatch::default();
        self.stage_session(&mut batch, &session)?;
        self.stage_customer(&mut batch, &customer)?;
        self.stage_transaction(&mut batch, &debit)?;
        self.write(batch)?;

        let earned_after = check.earned_balance - session.max_amount;
        tracing::info!(
            session_id = %session.id,
            customer = %session.customer,
            shop_id = %acting_shop,
            debited = session.max_amount,
            earned_after,
            "redemption session used"
        );

        Ok(RedemptionOutcome {
            debited: session.max_amount,
            earned_after,
            session,
        })
    }

    fn expire_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        let cf_sessions = self.cf(cf::SESSIONS)?;
        let iter = self.db.iterator_cf(&cf_sessions, IteratorMode::Start);

        let mut batch = WriteBatch::default();
        let mut expired = 0;

        for item in iter {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let mut session: RedemptionSession = Self::deserialize(&value)?;
            if session.is_lapsed(now) && session.expire().is_ok() {
                self.stage_session(&mut batch, &session)?;
                expired += 1;
            }
        }

        if expired > 0 {
            self.write(batch)?;
            tracing::debug!(count = expired, "expired lapsed redemption sessions");
        }

        Ok(expired)
    }

    // =========================================================================
    // Settlement
    // =========================================================================

    fn attach_settlement_hash(&self, transaction_id: &TransactionId, hash: &str) -> Result<()> {
        let Some(mut tx) = self
            .get_value::<Transaction>(cf::TRANSACTIONS, &keys::transaction_key(transaction_id))?
        else {
            return Err(EngineError::NotFound {
                entity: "transaction",
                id: transaction_id.to_string(),
            }
            .into());
        };

        tx.settlement_hash = Some(hash.to_string());

        let mut batch = WriteBatch::default();
        self.stage_value(&mut batch, cf::TRANSACTIONS, &keys::transaction_key(&tx.id), &tx)?;
        self.write(batch)
    }
}
