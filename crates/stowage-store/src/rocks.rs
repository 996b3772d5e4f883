//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store`
//! trait. Values are CBOR-encoded; compound operations validate and commit
//! through a single `WriteBatch` while holding the commit lock, so
//! check-then-write sequences on shared counters (free surface, stock) are
//! serialized against each other.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode, Options,
    WriteBatch,
};

use stowage_core::{
    EventStatus, LedgerTransaction, Order, OrderId, OrderStatus, Payout, Product, ProductId,
    Profile, Rental, RentalId, SpaceId, StorageSpace, TransactionStatus, UserId, WebhookEvent,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{OrderPlacement, RentalBooking, Store};

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<rocksdb::MultiThreaded>>,
    /// Serializes compound check-then-write operations. Individual reads
    /// and blind writes don't need it; anything that validates state and
    /// then commits based on that validation does.
    commit_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
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
            commit_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    fn commit_guard(&self) -> MutexGuard<'_, ()> {
        self.commit_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
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

    /// Fetch and decode one record.
    fn get_record<T: serde::de::DeserializeOwned>(
        &self,
        cf_name: &str,
        key: &[u8],
    ) -> Result<Option<T>> {
        let handle = self.cf(cf_name)?;
        self.db
            .get_cf(&handle, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn key_exists(&self, cf_name: &str, key: &[u8]) -> Result<bool> {
        let handle = self.cf(cf_name)?;
        Ok(self
            .db
            .get_cf(&handle, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_some())
    }

    /// Collect the entity-id halves of an owner's index entries, newest
    /// first (ULID/UUID suffixes under one owner prefix).
    fn scan_owned(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<[u8; 16]>> {
        let handle = self.cf(cf_name)?;
        let iter = self
            .db
            .iterator_cf(&handle, IteratorMode::From(prefix, Direction::Forward));

        let mut ids = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            ids.push(keys::extract_entity_bytes(&key));
        }

        ids.reverse();
        Ok(ids)
    }

    /// Decode every record in a column family.
    fn scan_all<T: serde::de::DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let handle = self.cf(cf_name)?;
        let mut records = Vec::new();
        for item in self.db.iterator_cf(&handle, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            records.push(Self::deserialize(&value)?);
        }
        Ok(records)
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Profile Operations
    // =========================================================================

    fn put_profile(&self, profile: &Profile) -> Result<()> {
        let _guard = self.commit_guard();

        let cf_profiles = self.cf(cf::PROFILES)?;
        let cf_by_account = self.cf(cf::PROFILES_BY_ACCOUNT)?;

        let key = keys::profile_key(&profile.user_id);
        let previous: Option<Profile> = self.get_record(cf::PROFILES, &key)?;

        let mut batch = WriteBatch::default();

        // Drop a stale account index entry when the payout account changed.
        if let Some(old_account) = previous.and_then(|p| p.payout_account_id) {
            if profile.payout_account_id.as_deref() != Some(old_account.as_str()) {
                batch.delete_cf(&cf_by_account, keys::str_key(&old_account));
            }
        }

        if let Some(account) = &profile.payout_account_id {
            batch.put_cf(
                &cf_by_account,
                keys::str_key(account),
                profile.user_id.as_bytes(),
            );
        }

        batch.put_cf(&cf_profiles, &key, Self::serialize(profile)?);
        self.write(batch)
    }

    fn get_profile(&self, user_id: &UserId) -> Result<Option<Profile>> {
        self.get_record(cf::PROFILES, &keys::profile_key(user_id))
    }

    fn get_profile_by_account(&self, account_id: &str) -> Result<Option<Profile>> {
        let cf_by_account = self.cf(cf::PROFILES_BY_ACCOUNT)?;
        let Some(user_bytes) = self
            .db
            .get_cf(&cf_by_account, keys::str_key(account_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        self.get_record(cf::PROFILES, &user_bytes)
    }

    fn list_profiles(&self, limit: usize, offset: usize) -> Result<Vec<Profile>> {
        let mut profiles: Vec<Profile> = self.scan_all(cf::PROFILES)?;
        profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(profiles.into_iter().skip(offset).take(limit).collect())
    }

    // =========================================================================
    // Storage Space Operations
    // =========================================================================

    fn create_space(&self, space: &StorageSpace) -> Result<()> {
        let _guard = self.commit_guard();

        let name_key = keys::str_key(&space.name);
        if self.key_exists(cf::SPACES_BY_NAME, &name_key)? {
            return Err(StoreError::Conflict {
                entity: "storage space",
                id: space.name.clone(),
            });
        }

        let cf_spaces = self.cf(cf::SPACES)?;
        let cf_by_name = self.cf(cf::SPACES_BY_NAME)?;
        let cf_by_owner = self.cf(cf::SPACES_BY_OWNER)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_spaces, keys::space_key(&space.id), Self::serialize(space)?);
        batch.put_cf(&cf_by_name, &name_key, space.id.as_bytes());
        batch.put_cf(
            &cf_by_owner,
            keys::owned_key(space.owner_id.as_bytes(), space.id.as_bytes()),
            [],
        );
        self.write(batch)
    }

    fn update_space(&self, space: &StorageSpace) -> Result<()> {
        let _guard = self.commit_guard();

        let key = keys::space_key(&space.id);
        let previous: StorageSpace =
            self.get_record(cf::SPACES, &key)?
                .ok_or_else(|| StoreError::NotFound {
                    entity: "storage space",
                    id: space.id.to_string(),
                })?;

        let cf_spaces = self.cf(cf::SPACES)?;
        let cf_by_name = self.cf(cf::SPACES_BY_NAME)?;

        let mut batch = WriteBatch::default();
        if previous.name != space.name {
            let name_key = keys::str_key(&space.name);
            if self.key_exists(cf::SPACES_BY_NAME, &name_key)? {
                return Err(StoreError::Conflict {
                    entity: "storage space",
                    id: space.name.clone(),
                });
            }
            batch.delete_cf(&cf_by_name, keys::str_key(&previous.name));
            batch.put_cf(&cf_by_name, &name_key, space.id.as_bytes());
        }

        batch.put_cf(&cf_spaces, &key, Self::serialize(space)?);
        self.write(batch)
    }

    fn get_space(&self, space_id: &SpaceId) -> Result<Option<StorageSpace>> {
        self.get_record(cf::SPACES, &keys::space_key(space_id))
    }

    fn delete_space(&self, space_id: &SpaceId) -> Result<()> {
        let _guard = self.commit_guard();

        let key = keys::space_key(space_id);
        let space: StorageSpace =
            self.get_record(cf::SPACES, &key)?
                .ok_or_else(|| StoreError::NotFound {
                    entity: "storage space",
                    id: space_id.to_string(),
                })?;

        let cf_spaces = self.cf(cf::SPACES)?;
        let cf_by_name = self.cf(cf::SPACES_BY_NAME)?;
        let cf_by_owner = self.cf(cf::SPACES_BY_OWNER)?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(&cf_spaces, &key);
        batch.delete_cf(&cf_by_name, keys::str_key(&space.name));
        batch.delete_cf(
            &cf_by_owner,
            keys::owned_key(space.owner_id.as_bytes(), space.id.as_bytes()),
        );
        self.write(batch)
    }

    fn list_spaces_by_owner(&self, owner_id: &UserId) -> Result<Vec<StorageSpace>> {
        let prefix = keys::owner_prefix(owner_id.as_bytes());
        let ids = self.scan_owned(cf::SPACES_BY_OWNER, &prefix)?;

        let mut spaces = Vec::with_capacity(ids.len());
        for id_bytes in ids {
            let id = SpaceId::from_uuid(uuid::Uuid::from_bytes(id_bytes));
            if let Some(space) = self.get_space(&id)? {
                spaces.push(space);
            }
        }
        Ok(spaces)
    }

    fn list_available_spaces(&self) -> Result<Vec<StorageSpace>> {
        let mut spaces: Vec<StorageSpace> = self.scan_all(cf::SPACES)?;
        spaces.retain(|s| s.available_surface > 0);
        spaces.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(spaces)
    }

    fn list_spaces(&self, limit: usize, offset: usize) -> Result<Vec<StorageSpace>> {
        let mut spaces: Vec<StorageSpace> = self.scan_all(cf::SPACES)?;
        spaces.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(spaces.into_iter().skip(offset).take(limit).collect())
    }

    // =========================================================================
    // Rental Operations
    // =========================================================================

    fn get_rental(&self, rental_id: RentalId) -> Result<Option<Rental>> {
        self.get_record(cf::RENTALS, &keys::rental_key(rental_id))
    }

    fn list_rentals_by_renter(&self, renter_id: &UserId) -> Result<Vec<Rental>> {
        let prefix = keys::owner_prefix(renter_id.as_bytes());
        let ids = self.scan_owned(cf::RENTALS_BY_RENTER, &prefix)?;

        let mut rentals = Vec::with_capacity(ids.len());
        for id_bytes in ids {
            if let Some(rental) = self.get_rental(RentalId::from_bytes(id_bytes))? {
                rentals.push(rental);
            }
        }
        Ok(rentals)
    }

    fn find_live_rental(
        &self,
        renter_id: &UserId,
        storage_id: &SpaceId,
        today: NaiveDate,
    ) -> Result<Option<Rental>> {
        Ok(self
            .list_rentals_by_renter(renter_id)?
            .into_iter()
            .find(|r| r.storage_id == *storage_id && r.is_live(today)))
    }

    fn activate_due_rentals(&self, today: NaiveDate) -> Result<usize> {
        let _guard = self.commit_guard();

        let cf_rentals = self.cf(cf::RENTALS)?;
        let rentals: Vec<Rental> = self.scan_all(cf::RENTALS)?;

        let mut batch = WriteBatch::default();
        let mut activated = 0;
        for mut rental in rentals {
            if rental.is_due(today) {
                rental.activate();
                batch.put_cf(
                    &cf_rentals,
                    keys::rental_key(rental.id),
                    Self::serialize(&rental)?,
                );
                activated += 1;
            }
        }

        if activated > 0 {
            self.write(batch)?;
        }
        Ok(activated)
    }

    // =========================================================================
    // Product Operations
    // =========================================================================

    fn create_product(&self, product: &Product) -> Result<()> {
        let _guard = self.commit_guard();

        let name_key = keys::str_key(&product.name);
        if self.key_exists(cf::PRODUCTS_BY_NAME, &name_key)? {
            return Err(StoreError::Conflict {
                entity: "product",
                id: product.name.clone(),
            });
        }

        let cf_products = self.cf(cf::PRODUCTS)?;
        let cf_by_name = self.cf(cf::PRODUCTS_BY_NAME)?;
        let cf_by_rental = self.cf(cf::PRODUCTS_BY_RENTAL)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            &cf_products,
            keys::product_key(&product.id),
            Self::serialize(product)?,
        );
        batch.put_cf(&cf_by_name, &name_key, product.id.as_bytes());
        batch.put_cf(
            &cf_by_rental,
            keys::owned_key(&product.rental_id.to_bytes(), product.id.as_bytes()),
            [],
        );
        self.write(batch)
    }

    fn update_product(&self, product: &Product) -> Result<()> {
        let _guard = self.commit_guard();

        let key = keys::product_key(&product.id);
        let previous: Product =
            self.get_record(cf::PRODUCTS, &key)?
                .ok_or_else(|| StoreError::NotFound {
                    entity: "product",
                    id: product.id.to_string(),
                })?;

        let cf_products = self.cf(cf::PRODUCTS)?;
        let cf_by_name = self.cf(cf::PRODUCTS_BY_NAME)?;

        let mut batch = WriteBatch::default();
        if previous.name != product.name {
            let name_key = keys::str_key(&product.name);
            if self.key_exists(cf::PRODUCTS_BY_NAME, &name_key)? {
                return Err(StoreError::Conflict {
                    entity: "product",
                    id: product.name.clone(),
                });
            }
            batch.delete_cf(&cf_by_name, keys::str_key(&previous.name));
            batch.put_cf(&cf_by_name, &name_key, product.id.as_bytes());
        }

        batch.put_cf(&cf_products, &key, Self::serialize(product)?);
        self.write(batch)
    }

    fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>> {
        self.get_record(cf::PRODUCTS, &keys::product_key(product_id))
    }

    fn delete_product(&self, product_id: &ProductId) -> Result<()> {
        let _guard = self.commit_guard();

        let key = keys::product_key(product_id);
        let product: Product =
            self.get_record(cf::PRODUCTS, &key)?
                .ok_or_else(|| StoreError::NotFound {
                    entity: "product",
                    id: product_id.to_string(),
                })?;

        let cf_products = self.cf(cf::PRODUCTS)?;
        let cf_by_name = self.cf(cf::PRODUCTS_BY_NAME)?;
        let cf_by_rental = self.cf(cf::PRODUCTS_BY_RENTAL)?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(&cf_products, &key);
        batch.delete_cf(&cf_by_name, keys::str_key(&product.name));
        batch.delete_cf(
            &cf_by_rental,
            keys::owned_key(&product.rental_id.to_bytes(), product.id.as_bytes()),
        );
        self.write(batch)
    }

    fn list_products_by_rental(&self, rental_id: RentalId) -> Result<Vec<Product>> {
        let prefix = keys::owner_prefix(&rental_id.to_bytes());
        let ids = self.scan_owned(cf::PRODUCTS_BY_RENTAL, &prefix)?;

        let mut products = Vec::with_capacity(ids.len());
        for id_bytes in ids {
            let id = ProductId::from_uuid(uuid::Uuid::from_bytes(id_bytes));
            if let Some(product) = self.get_product(&id)? {
                products.push(product);
            }
        }
        Ok(products)
    }

    fn list_products(&self, limit: usize, offset: usize) -> Result<Vec<Product>> {
        let mut products: Vec<Product> = self.scan_all(cf::PRODUCTS)?;
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products.into_iter().skip(offset).take(limit).collect())
    }

    // =========================================================================
    // Order Operations
    // =========================================================================

    fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        self.get_record(cf::ORDERS, &keys::order_key(order_id))
    }

    fn get_order_by_session(&self, session_id: &str) -> Result<Option<Order>> {
        let cf_by_session = self.cf(cf::ORDERS_BY_SESSION)?;
        let Some(order_bytes) = self
            .db
            .get_cf(&cf_by_session, keys::str_key(session_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        self.get_record(cf::ORDERS, &order_bytes)
    }

    fn list_orders_by_buyer(&self, buyer_id: &UserId) -> Result<Vec<Order>> {
        let prefix = keys::owner_prefix(buyer_id.as_bytes());
        let ids = self.scan_owned(cf::ORDERS_BY_BUYER, &prefix)?;

        let mut orders = Vec::with_capacity(ids.len());
        for id_bytes in ids {
            if let Some(order) = self.get_order(OrderId::from_bytes(id_bytes))? {
                orders.push(order);
            }
        }
        Ok(orders)
    }

    fn update_order_status(&self, order_id: OrderId, status: OrderStatus) -> Result<Order> {
        let _guard = self.commit_guard();

        let key = keys::order_key(order_id);
        let mut order: Order =
            self.get_record(cf::ORDERS, &key)?
                .ok_or_else(|| StoreError::NotFound {
                    entity: "order",
                    id: order_id.to_string(),
                })?;

        order.status = status;

        let cf_orders = self.cf(cf::ORDERS)?;
        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_orders, &key, Self::serialize(&order)?);
        self.write(batch)?;

        Ok(order)
    }

    // =========================================================================
    // Ledger Operations
    // =========================================================================

    fn ledger_contains(&self, transaction_id: &str) -> Result<bool> {
        self.key_exists(cf::TRANSACTIONS, &keys::str_key(transaction_id))
    }

    fn get_transaction(&self, transaction_id: &str) -> Result<Option<LedgerTransaction>> {
        self.get_record(cf::TRANSACTIONS, &keys::str_key(transaction_id))
    }

    fn list_transactions(&self, limit: usize, offset: usize) -> Result<Vec<LedgerTransaction>> {
        let mut transactions: Vec<LedgerTransaction> = self.scan_all(cf::TRANSACTIONS)?;
        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(transactions.into_iter().skip(offset).take(limit).collect())
    }

    // =========================================================================
    // Webhook Event Log
    // =========================================================================

    fn record_event(&self, event: &WebhookEvent) -> Result<()> {
        let _guard = self.commit_guard();

        let key = keys::str_key(&event.event_id);
        if self.key_exists(cf::EVENTS, &key)? {
            return Err(StoreError::DuplicateEvent {
                event_id: event.event_id.clone(),
            });
        }

        let cf_events = self.cf(cf::EVENTS)?;
        self.db
            .put_cf(&cf_events, key, Self::serialize(event)?)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn get_event(&self, event_id: &str) -> Result<Option<WebhookEvent>> {
        self.get_record(cf::EVENTS, &keys::str_key(event_id))
    }

    fn set_event_status(&self, event_id: &str, status: EventStatus) -> Result<()> {
        let _guard = self.commit_guard();

        let key = keys::str_key(event_id);
        let mut event: WebhookEvent =
            self.get_record(cf::EVENTS, &key)?
                .ok_or_else(|| StoreError::NotFound {
                    entity: "webhook event",
                    id: event_id.to_string(),
                })?;

        event.status = status;

        let cf_events = self.cf(cf::EVENTS)?;
        self.db
            .put_cf(&cf_events, key, Self::serialize(&event)?)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn list_events_with_status(
        &self,
        status: EventStatus,
        limit: usize,
    ) -> Result<Vec<WebhookEvent>> {
        let mut events: Vec<WebhookEvent> = self.scan_all(cf::EVENTS)?;
        events.retain(|e| e.status == status);
        // Oldest first: the sweep drains the backlog in arrival order.
        events.sort_by(|a, b| a.received_at.cmp(&b.received_at));
        events.truncate(limit);
        Ok(events)
    }

    // =========================================================================
    // Payout Operations
    // =========================================================================

    fn get_payout(&self, payout_id: &str) -> Result<Option<Payout>> {
        self.get_record(cf::PAYOUTS, &keys::str_key(payout_id))
    }

    fn record_payout(&self, payout: &Payout, transaction: &LedgerTransaction) -> Result<()> {
        let _guard = self.commit_guard();

        let cf_payouts = self.cf(cf::PAYOUTS)?;
        let cf_transactions = self.cf(cf::TRANSACTIONS)?;
        let key = keys::str_key(&payout.payout_id);

        let existing: Option<Payout> = self.get_record(cf::PAYOUTS, &key)?;

        let mut batch = WriteBatch::default();
        match existing {
            Some(mut known) => {
                // Creation replayed or observed after a failure notice:
                // refresh the status, keep the original record.
                known.status = payout.status;
                batch.put_cf(&cf_payouts, &key, Self::serialize(&known)?);
            }
            None => {
                batch.put_cf(&cf_payouts, &key, Self::serialize(payout)?);
            }
        }

        if !self.ledger_contains(&transaction.transaction_id)? {
            batch.put_cf(
                &cf_transactions,
                keys::str_key(&transaction.transaction_id),
                Self::serialize(transaction)?,
            );
        }

        self.write(batch)
    }

    fn mark_payout_failed(&self, payout_id: &str, fallback: &Payout) -> Result<Payout> {
        let _guard = self.commit_guard();

        let cf_payouts = self.cf(cf::PAYOUTS)?;
        let cf_transactions = self.cf(cf::TRANSACTIONS)?;
        let key = keys::str_key(payout_id);

        let mut payout = self
            .get_record::<Payout>(cf::PAYOUTS, &key)?
            .unwrap_or_else(|| fallback.clone());
        payout.mark_failed();

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_payouts, &key, Self::serialize(&payout)?);

        // Keep the ledger in step: update the entry if we have one, create
        // a failed entry if the creation event never reached us.
        let tx_key = keys::str_key(payout_id);
        let entry = match self.get_transaction(payout_id)? {
            Some(mut tx) => {
                tx.status = TransactionStatus::Failed;
                tx
            }
            None => LedgerTransaction::payout(
                payout_id,
                payout.destination_account_id.clone(),
                payout.amount_cents,
                payout.currency.clone(),
                TransactionStatus::Failed,
            ),
        };
        batch.put_cf(&cf_transactions, tx_key, Self::serialize(&entry)?);

        self.write(batch)?;
        Ok(payout)
    }

    // =========================================================================
    // Compound Operations (webhook side effects)
    // =========================================================================

    fn apply_rental(
        &self,
        transaction: &LedgerTransaction,
        booking: &RentalBooking,
        today: NaiveDate,
    ) -> Result<Rental> {
        let _guard = self.commit_guard();

        // Idempotency barrier first: a replayed confirmation stops here.
        if self.ledger_contains(&transaction.transaction_id)? {
            return Err(StoreError::DuplicateTransaction {
                transaction_id: transaction.transaction_id.clone(),
            });
        }

        let mut space = self
            .get_space(&booking.storage_id)?
            .ok_or_else(|| StoreError::NotFound {
                entity: "storage space",
                id: booking.storage_id.to_string(),
            })?;

        if self
            .find_live_rental(&booking.renter_id, &booking.storage_id, today)?
            .is_some()
        {
            return Err(StoreError::AlreadyRented {
                storage_id: booking.storage_id.to_string(),
            });
        }

        space.commit_rental(booking.space_amount)?;

        let rental = Rental::new(
            booking.renter_id,
            booking.storage_id,
            booking.space_amount,
            booking.start_date,
            booking.end_date,
            today,
        )?;

        let cf_spaces = self.cf(cf::SPACES)?;
        let cf_rentals = self.cf(cf::RENTALS)?;
        let cf_by_renter = self.cf(cf::RENTALS_BY_RENTER)?;
        let cf_transactions = self.cf(cf::TRANSACTIONS)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_spaces, keys::space_key(&space.id), Self::serialize(&space)?);
        batch.put_cf(
            &cf_rentals,
            keys::rental_key(rental.id),
            Self::serialize(&rental)?,
        );
        batch.put_cf(
            &cf_by_renter,
            keys::owned_key(rental.renter_id.as_bytes(), &rental.id.to_bytes()),
            [],
        );
        batch.put_cf(
            &cf_transactions,
            keys::str_key(&transaction.transaction_id),
            Self::serialize(transaction)?,
        );
        self.write(batch)?;

        Ok(rental)
    }

    fn apply_order(
        &self,
        transaction: &LedgerTransaction,
        placement: &OrderPlacement,
    ) -> Result<Order> {
        let _guard = self.commit_guard();

        if self.ledger_contains(&transaction.transaction_id)? {
            return Err(StoreError::DuplicateTransaction {
                transaction_id: transaction.transaction_id.clone(),
            });
        }

        if self.get_space(&placement.storage_id)?.is_none() {
            return Err(StoreError::NotFound {
                entity: "storage space",
                id: placement.storage_id.to_string(),
            });
        }

        // Secondary guard: the session index catches retries that arrive
        // under a different ledger key.
        if self.key_exists(cf::ORDERS_BY_SESSION, &keys::str_key(&placement.session_id))? {
            return Err(StoreError::DuplicateTransaction {
                transaction_id: placement.session_id.clone(),
            });
        }

        let mut product =
            self.get_product(&placement.product_id)?
                .ok_or_else(|| StoreError::NotFound {
                    entity: "product",
                    id: placement.product_id.to_string(),
                })?;

        // Stock is validated before anything is written; a short-stock
        // purchase persists no order and no ledger entry.
        product.deduct_stock(placement.quantity)?;

        let order = Order::new(
            placement.storage_id,
            placement.product_id,
            placement.quantity,
            placement.unit_price_cents,
            placement.buyer_id,
            placement.session_id.clone(),
        )?;

        let cf_products = self.cf(cf::PRODUCTS)?;
        let cf_orders = self.cf(cf::ORDERS)?;
        let cf_by_buyer = self.cf(cf::ORDERS_BY_BUYER)?;
        let cf_by_session = self.cf(cf::ORDERS_BY_SESSION)?;
        let cf_transactions = self.cf(cf::TRANSACTIONS)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            &cf_products,
            keys::product_key(&product.id),
            Self::serialize(&product)?,
        );
        batch.put_cf(&cf_orders, keys::order_key(order.id), Self::serialize(&order)?);
        batch.put_cf(
            &cf_by_buyer,
            keys::owned_key(order.buyer_id.as_bytes(), &order.id.to_bytes()),
            [],
        );
        batch.put_cf(
            &cf_by_session,
            keys::str_key(&order.session_id),
            order.id.to_bytes(),
        );
        batch.put_cf(
            &cf_transactions,
            keys::str_key(&transaction.transaction_id),
            Self::serialize(transaction)?,
        );
        self.write(batch)?;

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stowage_core::{PayoutStatus, Profile, Role};
    use tempfile::TempDir;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    fn seed_space(store: &RocksStore, total: i64) -> StorageSpace {
        let space = StorageSpace::new(
            UserId::generate(),
            format!("Hangar-{}", SpaceId::generate()),
            "4 quai des Chartrons",
            total,
            500,
        )
        .unwrap();
        store.create_space(&space).unwrap();
        space
    }

    fn booking(space: &StorageSpace, amount: i64, start: NaiveDate) -> RentalBooking {
        RentalBooking {
            renter_id: UserId::generate(),
            storage_id: space.id,
            space_amount: amount,
            start_date: start,
            end_date: start + chrono::Days::new(90),
        }
    }

    fn rental_tx(session: &str, booking: &RentalBooking, space: &StorageSpace) -> LedgerTransaction {
        LedgerTransaction::rental(session, booking.renter_id, space.owner_id, 20_000, "eur")
    }

    #[test]
    fn space_name_is_unique() {
        let (store, _dir) = create_test_store();
        let owner = UserId::generate();

        let a = StorageSpace::new(owner, "Hangar Nord", "rue A", 50, 500).unwrap();
        store.create_space(&a).unwrap();

        let b = StorageSpace::new(owner, "Hangar Nord", "rue B", 80, 700).unwrap();
        let err = store.create_space(&b).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[test]
    fn apply_rental_moves_surface_and_writes_ledger() {
        let (store, _dir) = create_test_store();
        let space = seed_space(&store, 100);
        let booking = booking(&space, 40, today());
        let tx = rental_tx("cs_rent_1", &booking, &space);

        let rental = store.apply_rental(&tx, &booking, today()).unwrap();
        assert!(rental.active);
        assert!(!rental.reserved);

        let updated = store.get_space(&space.id).unwrap().unwrap();
        assert_eq!(updated.available_surface, 60);
        assert_eq!(updated.rented_surface, 40);
        assert!(store.ledger_contains("cs_rent_1").unwrap());
        assert_eq!(store.list_rentals_by_renter(&booking.renter_id).unwrap().len(), 1);
    }

    #[test]
    fn apply_rental_replay_is_rejected_without_mutation() {
        let (store, _dir) = create_test_store();
        let space = seed_space(&store, 100);
        let booking = booking(&space, 40, today());
        let tx = rental_tx("cs_rent_replay", &booking, &space);

        store.apply_rental(&tx, &booking, today()).unwrap();

        for _ in 0..3 {
            let err = store.apply_rental(&tx, &booking, today()).unwrap_err();
            assert!(matches!(err, StoreError::DuplicateTransaction { .. }));
        }

        let updated = store.get_space(&space.id).unwrap().unwrap();
        assert_eq!(updated.available_surface, 60);
        assert_eq!(store.list_rentals_by_renter(&booking.renter_id).unwrap().len(), 1);
    }

    #[test]
    fn apply_rental_rejects_overcommit() {
        let (store, _dir) = create_test_store();
        let space = seed_space(&store, 100);

        let first = booking(&space, 40, today());
        store
            .apply_rental(&rental_tx("cs_rent_a", &first, &space), &first, today())
            .unwrap();

        let second = booking(&space, 70, today());
        let err = store
            .apply_rental(&rental_tx("cs_rent_b", &second, &space), &second, today())
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::InsufficientCapacity {
                available: 60,
                requested: 70
            }
        ));
        // Nothing from the failed attempt persisted.
        assert!(!store.ledger_contains("cs_rent_b").unwrap());
        assert!(store.list_rentals_by_renter(&second.renter_id).unwrap().is_empty());
    }

    #[test]
    fn concurrent_rentals_cannot_both_pass_the_capacity_check() {
        let (store, _dir) = create_test_store();
        let store = std::sync::Arc::new(store);
        let space = seed_space(&store, 10);

        let mut handles = Vec::new();
        for i in 0..2 {
            let store = std::sync::Arc::clone(&store);
            let space = space.clone();
            handles.push(std::thread::spawn(move || {
                let b = booking(&space, 6, today());
                let tx = rental_tx(&format!("cs_race_{i}"), &b, &space);
                store.apply_rental(&tx, &b, today())
            }));
        }

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "exactly one rental must win the last 6 units");
        assert!(results.iter().any(|r| matches!(
            r,
            Err(StoreError::InsufficientCapacity { .. })
        )));

        let updated = store.get_space(&space.id).unwrap().unwrap();
        assert_eq!(updated.available_surface, 4);
        assert_eq!(updated.rented_surface, 6);
    }

    #[test]
    fn renter_cannot_hold_two_live_rentals_on_one_space() {
        let (store, _dir) = create_test_store();
        let space = seed_space(&store, 100);
        let renter = UserId::generate();

        let mut first = booking(&space, 10, today());
        first.renter_id = renter;
        store
            .apply_rental(&rental_tx("cs_dup_a", &first, &space), &first, today())
            .unwrap();

        let mut second = booking(&space, 10, today());
        second.renter_id = renter;
        let err = store
            .apply_rental(&rental_tx("cs_dup_b", &second, &space), &second, today())
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyRented { .. }));
    }

    fn seed_product(store: &RocksStore, stock: i64) -> Product {
        let product = Product::new(
            RentalId::generate(),
            format!("Produit-{}", ProductId::generate()),
            "BoisPro",
            "Lames de parquet massif",
            2500,
            stock,
        )
        .unwrap();
        store.create_product(&product).unwrap();
        product
    }

    fn placement(space: &StorageSpace, product: &Product, qty: i64, session: &str) -> OrderPlacement {
        OrderPlacement {
            buyer_id: UserId::generate(),
            storage_id: space.id,
            product_id: product.id,
            quantity: qty,
            unit_price_cents: product.price_cents,
            session_id: session.to_string(),
        }
    }

    #[test]
    fn apply_order_decrements_stock_and_writes_ledger() {
        let (store, _dir) = create_test_store();
        let space = seed_space(&store, 100);
        let product = seed_product(&store, 10);
        let p = placement(&space, &product, 3, "cs_order_1");
        let tx = LedgerTransaction::purchase(
            "cs_order_1",
            p.buyer_id,
            UserId::generate(),
            7500,
            "eur",
        );

        let order = store.apply_order(&tx, &p).unwrap();
        assert_eq!(order.total_price_cents, 7500);
        assert_eq!(order.status, OrderStatus::ToCollect);

        let updated = store.get_product(&product.id).unwrap().unwrap();
        assert_eq!(updated.stock_quantity, 7);
        assert!(store.ledger_contains("cs_order_1").unwrap());
        assert_eq!(
            store.get_order_by_session("cs_order_1").unwrap().unwrap().id,
            order.id
        );
    }

    #[test]
    fn apply_order_short_stock_persists_nothing() {
        let (store, _dir) = create_test_store();
        let space = seed_space(&store, 100);
        let product = seed_product(&store, 2);
        let p = placement(&space, &product, 3, "cs_order_short");
        let tx = LedgerTransaction::purchase(
            "cs_order_short",
            p.buyer_id,
            UserId::generate(),
            7500,
            "eur",
        );

        let err = store.apply_order(&tx, &p).unwrap_err();
        assert!(matches!(
            err,
            StoreError::InsufficientStock {
                stock: 2,
                requested: 3
            }
        ));

        // No order, no ledger entry, stock untouched.
        assert!(store.get_order_by_session("cs_order_short").unwrap().is_none());
        assert!(!store.ledger_contains("cs_order_short").unwrap());
        assert_eq!(
            store.get_product(&product.id).unwrap().unwrap().stock_quantity,
            2
        );
        assert!(store.list_orders_by_buyer(&p.buyer_id).unwrap().is_empty());
    }

    #[test]
    fn apply_order_replay_is_rejected() {
        let (store, _dir) = create_test_store();
        let space = seed_space(&store, 100);
        let product = seed_product(&store, 10);
        let p = placement(&space, &product, 3, "cs_order_replay");
        let tx = LedgerTransaction::purchase(
            "cs_order_replay",
            p.buyer_id,
            UserId::generate(),
            7500,
            "eur",
        );

        store.apply_order(&tx, &p).unwrap();
        let err = store.apply_order(&tx, &p).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateTransaction { .. }));
        assert_eq!(
            store.get_product(&product.id).unwrap().unwrap().stock_quantity,
            7
        );
    }

    #[test]
    fn payout_failed_without_creation_upserts() {
        let (store, _dir) = create_test_store();

        let fallback = Payout {
            payout_id: "po_ghost".into(),
            destination_account_id: "acct_9".into(),
            amount_cents: 4200,
            currency: "eur".into(),
            status: PayoutStatus::Pending,
            created_at: Utc::now(),
        };

        let payout = store.mark_payout_failed("po_ghost", &fallback).unwrap();
        assert_eq!(payout.status, PayoutStatus::Failed);

        let stored = store.get_payout("po_ghost").unwrap().unwrap();
        assert_eq!(stored.status, PayoutStatus::Failed);

        let tx = store.get_transaction("po_ghost").unwrap().unwrap();
        assert_eq!(tx.status, TransactionStatus::Failed);
    }

    #[test]
    fn payout_created_then_failed() {
        let (store, _dir) = create_test_store();

        let payout = Payout {
            payout_id: "po_1".into(),
            destination_account_id: "acct_1".into(),
            amount_cents: 10_000,
            currency: "eur".into(),
            status: PayoutStatus::Pending,
            created_at: Utc::now(),
        };
        let tx = LedgerTransaction::payout(
            "po_1",
            "acct_1",
            10_000,
            "eur",
            TransactionStatus::Pending,
        );
        store.record_payout(&payout, &tx).unwrap();

        // Replaying the creation does not duplicate the ledger entry.
        store.record_payout(&payout, &tx).unwrap();

        let failed = store.mark_payout_failed("po_1", &payout).unwrap();
        assert_eq!(failed.status, PayoutStatus::Failed);
        assert_eq!(
            store.get_transaction("po_1").unwrap().unwrap().status,
            TransactionStatus::Failed
        );
    }

    #[test]
    fn event_log_detects_duplicates() {
        let (store, _dir) = create_test_store();

        let ev = WebhookEvent::received("evt_1", "payout.created", serde_json::json!({}));
        store.record_event(&ev).unwrap();

        let err = store.record_event(&ev).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEvent { .. }));
    }

    #[test]
    fn event_status_drives_the_sweep_listing() {
        let (store, _dir) = create_test_store();

        for i in 0..3 {
            let ev = WebhookEvent::received(
                format!("evt_{i}"),
                "checkout.session.completed",
                serde_json::json!({}),
            );
            store.record_event(&ev).unwrap();
        }
        store.set_event_status("evt_1", EventStatus::Applied).unwrap();

        let pending = store
            .list_events_with_status(EventStatus::Received, 10)
            .unwrap();
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().all(|e| e.event_id != "evt_1"));
    }

    #[test]
    fn due_reservations_are_activated() {
        let (store, _dir) = create_test_store();
        let space = seed_space(&store, 100);

        let start = today() + chrono::Days::new(7);
        let b = booking(&space, 10, start);
        let tx = rental_tx("cs_future", &b, &space);
        let rental = store.apply_rental(&tx, &b, today()).unwrap();
        assert!(rental.reserved);

        // Nothing due yet.
        assert_eq!(store.activate_due_rentals(today()).unwrap(), 0);

        // Start date arrives.
        assert_eq!(store.activate_due_rentals(start).unwrap(), 1);
        let updated = store.get_rental(rental.id).unwrap().unwrap();
        assert!(updated.active);
        assert!(!updated.reserved);

        // Idempotent.
        assert_eq!(store.activate_due_rentals(start).unwrap(), 0);
    }

    #[test]
    fn profile_account_index_follows_updates() {
        let (store, _dir) = create_test_store();

        let mut profile = Profile::new(UserId::generate(), "Dock Sud", Role::Lessor);
        profile.payout_account_id = Some("acct_old".into());
        store.put_profile(&profile).unwrap();

        assert!(store.get_profile_by_account("acct_old").unwrap().is_some());

        profile.payout_account_id = Some("acct_new".into());
        store.put_profile(&profile).unwrap();

        assert!(store.get_profile_by_account("acct_old").unwrap().is_none());
        assert_eq!(
            store
                .get_profile_by_account("acct_new")
                .unwrap()
                .unwrap()
                .user_id,
            profile.user_id
        );
    }

    #[test]
    fn order_status_update() {
        let (store, _dir) = create_test_store();
        let space = seed_space(&store, 100);
        let product = seed_product(&store, 5);
        let p = placement(&space, &product, 1, "cs_status");
        let tx = LedgerTransaction::purchase("cs_status", p.buyer_id, UserId::generate(), 2500, "eur");

        let order = store.apply_order(&tx, &p).unwrap();
        let updated = store
            .update_order_status(order.id, OrderStatus::Collected)
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Collected);
    }
}
