#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use tokio::sync::Notify;

use ferdi_session::authz::{Role, RoleId};
use ferdi_session::client::IdentityApi;
use ferdi_session::clock::{Clock, ManualClock};
use ferdi_session::errors::{AppError, AppResult};
use ferdi_session::models::{
    AccessToken, CompanyRegistration, CompanyRegistrationRequest, CompanyStatus, Identity,
    Organization, SignupRequest,
};
use ferdi_session::session::SessionController;
use ferdi_session::storage::{MemoryStore, SessionStorage};
use ferdi_session::SessionConfig;

pub const TOKEN: &str = "opaque-test-token";

pub fn identity(role: Role) -> Identity {
    Identity {
        id: format!("user-{}", role.id()),
        email: format!("user{}@transport-bretagne.fr", role.id()),
        first_name: "Jean".into(),
        last_name: "Dupont".into(),
        full_name: None,
        mobile: None,
        role: RoleId::from(role),
        is_active: true,
        created_at: None,
        last_login_at: None,
    }
}

pub fn organization(status: CompanyStatus) -> Organization {
    Organization {
        id: "company-001".into(),
        name: "Transport Bretagne".into(),
        company_code: Some("TB2024".into()),
        status,
        subscription_plan: Some("premium".into()),
        max_users: Some(50),
        max_vehicles: Some(-1),
        siret: None,
        address: None,
        city: Some("Rennes".into()),
        postal_code: None,
        country: Some("France".into()),
        phone: None,
        email: None,
        website: None,
        created_at: None,
    }
}

/// Scriptable backend double that counts every call.
pub struct FakeApi {
    pub identity: Mutex<Identity>,
    pub organization: Mutex<Organization>,
    pub login_failure: Mutex<Option<fn() -> AppError>>,
    pub fetch_failure: Mutex<Option<fn() -> AppError>>,
    /// When set, `current_identity` parks until notified.
    pub hold: Mutex<Option<Arc<Notify>>>,
    pub login_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
}

impl FakeApi {
    pub fn new(identity: Identity, organization: Organization) -> Self {
        Self {
            identity: Mutex::new(identity),
            organization: Mutex::new(organization),
            login_failure: Mutex::new(None),
            fetch_failure: Mutex::new(None),
            hold: Mutex::new(None),
            login_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    pub fn active(role: Role) -> Self {
        Self::new(identity(role), organization(CompanyStatus::Active))
    }

    pub fn fail_fetch_with(&self, failure: Option<fn() -> AppError>) {
        *self.fetch_failure.lock() = failure;
    }

    pub fn fetches(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityApi for FakeApi {
    async fn login(&self, _email: &str, _password: &str) -> AppResult<AccessToken> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = *self.login_failure.lock() {
            return Err(failure());
        }
        Ok(AccessToken {
            access_token: TOKEN.to_string(),
            token_type: Some("bearer".into()),
        })
    }

    async fn current_identity(&self, _token: &str) -> AppResult<Identity> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let hold = self.hold.lock().clone();
        if let Some(notify) = hold {
            notify.notified().await;
        }
        if let Some(failure) = *self.fetch_failure.lock() {
            return Err(failure());
        }
        Ok(self.identity.lock().clone())
    }

    async fn my_organization(&self, _token: &str) -> AppResult<Organization> {
        Ok(self.organization.lock().clone())
    }

    async fn signup(&self, request: &SignupRequest) -> AppResult<Identity> {
        let mut created = identity(Role::Driver);
        created.email = request.email.clone();
        Ok(created)
    }

    async fn register_organization(
        &self,
        _request: &CompanyRegistrationRequest,
    ) -> AppResult<CompanyRegistration> {
        Ok(CompanyRegistration {
            company_code: "TB2024".into(),
            message: Some("awaiting validation".into()),
        })
    }
}

pub struct Harness {
    pub api: Arc<FakeApi>,
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryStore>,
    pub config: SessionConfig,
    pub controller: Arc<SessionController>,
}

impl Harness {
    pub fn new(api: FakeApi) -> Self {
        Self::build(api, Arc::new(MemoryStore::new()), SessionConfig::default())
    }

    pub fn with_store(api: FakeApi, store: Arc<MemoryStore>) -> Self {
        Self::build(api, store, SessionConfig::default())
    }

    pub fn with_config(api: FakeApi, config: SessionConfig) -> Self {
        Self::build(api, Arc::new(MemoryStore::new()), config)
    }

    fn build(api: FakeApi, store: Arc<MemoryStore>, config: SessionConfig) -> Self {
        let start = Utc
            .with_ymd_and_hms(2026, 3, 2, 8, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        let clock = Arc::new(ManualClock::new(start));
        let api = Arc::new(api);
        let controller = controller(api.clone(), store.clone(), clock.clone(), config.clone());
        Self {
            api,
            clock,
            store,
            config,
            controller,
        }
    }

    /// A second controller over the same storage, as after a restart.
    pub fn reopen(&self) -> Arc<SessionController> {
        controller(
            self.api.clone(),
            self.store.clone(),
            self.clock.clone(),
            self.config.clone(),
        )
    }
}

fn controller(
    api: Arc<FakeApi>,
    store: Arc<MemoryStore>,
    clock: Arc<ManualClock>,
    config: SessionConfig,
) -> Arc<SessionController> {
    let clock: Arc<dyn Clock> = clock;
    let storage = SessionStorage::new(store, clock.clone(), config.storage_retention);
    Arc::new(SessionController::new(api, storage, clock, config))
}
