//! Common test utilities for stowage integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use chrono::{NaiveDate, Utc};
use tempfile::TempDir;

use stowage_core::{Product, Profile, RentalId, Role, SpaceId, StorageSpace, UserId};
use stowage_service::{create_router, AppState, ServiceConfig};
use stowage_store::{RentalBooking, RocksStore, Store};

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// App state handle for driving the reconciliation sweep directly.
    pub state: AppState,
    /// Direct store access for seeding and assertions.
    pub store: Arc<RocksStore>,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
    /// A test user ID for authenticated requests.
    pub test_user_id: UserId,
    /// The admin API key accepted by the dashboard.
    pub admin_api_key: String,
}

impl TestHarness {
    /// Create a new test harness with a fresh database.
    ///
    /// No webhook secret is configured, so signature verification is
    /// skipped and tests can post webhook payloads directly.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = Arc::new(RocksStore::open(temp_dir.path()).expect("Failed to open store"));

        let admin_api_key = "test-admin-key".to_string();

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            auth_base_url: "http://localhost".into(),
            auth_audience: "stowage".into(),
            admin_api_key: Some(admin_api_key.clone()),
            stripe_api_key: None,
            stripe_webhook_secret: None,
            frontend_url: "http://localhost:3000".into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            platform_fee_percent: 10,
            currency: "eur".into(),
            reconcile_interval_seconds: 0,
        };

        let state = AppState::new(Arc::clone(&store), config);
        let router: Router = create_router(state.clone());

        let server = TestServer::new(router).expect("Failed to create test server");
        let test_user_id = UserId::generate();

        Self {
            server,
            state,
            store,
            _temp_dir: temp_dir,
            test_user_id,
            admin_api_key,
        }
    }

    /// Get the authorization header for user authentication.
    pub fn user_auth_header(&self) -> String {
        format!("Bearer test-token:{}", self.test_user_id)
    }

    /// Get an arbitrary other user's auth header (for testing isolation).
    pub fn other_user_auth_header() -> String {
        format!("Bearer test-token:{}", UserId::generate())
    }

    /// Today in the service's clock.
    pub fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    /// Seed a storage space owned by a fresh lessor.
    pub fn seed_space(&self, total_surface: i64, price_cents: i64) -> StorageSpace {
        let owner = UserId::generate();
        let profile = Profile::new(owner, "Test Lessor", Role::Lessor);
        self.store.put_profile(&profile).expect("seed profile");

        let space = StorageSpace::new(
            owner,
            format!("Espace-{}", SpaceId::generate()),
            "7 rue des Entrepots",
            total_surface,
            price_cents,
        )
        .expect("seed space");
        self.store.create_space(&space).expect("seed space insert");
        space
    }

    /// Seed a product on a confirmed rental inside `space`, held by a
    /// fresh supplier. Returns the product.
    pub fn seed_product(&self, space: &StorageSpace, stock: i64, price_cents: i64) -> Product {
        let supplier = UserId::generate();
        let booking = RentalBooking {
            renter_id: supplier,
            storage_id: space.id,
            space_amount: 5,
            start_date: Self::today(),
            end_date: Self::today() + chrono::Days::new(90),
        };
        let tx = stowage_core::LedgerTransaction::rental(
            format!("cs_seed_{}", RentalId::generate()),
            supplier,
            space.owner_id,
            space.price_cents * 5,
            "eur",
        );
        let rental = self
            .store
            .apply_rental(&tx, &booking, Self::today())
            .expect("seed rental");

        let product = Product::new(
            rental.id,
            format!("Produit-{}", rental.id),
            "BoisPro",
            "Lames de parquet massif",
            price_cents,
            stock,
        )
        .expect("seed product");
        self.store.create_product(&product).expect("seed product insert");
        product
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
