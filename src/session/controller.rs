use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use super::{
    AuthCheck, AuthReason, AuthStatus, LogoutReason, SessionEvent, SessionInfo, StoredSession,
    CURRENT_PATH_KEY, INTENDED_PATH_KEY, SESSION_KEY,
};
use crate::authz::{self, Principal, RoleDefinition, RoleId};
use crate::cache::CredentialCache;
use crate::client::IdentityApi;
use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{
    CompanyDetails, CompanyRegistration, CompanyRegistrationRequest, Identity, ManagerDetails,
    Organization, SignupRequest,
};
use crate::storage::SessionStorage;
use crate::utils::token_fingerprint;

#[derive(Debug)]
struct SessionState {
    status: AuthStatus,
    session: Option<StoredSession>,
    identity: Option<Identity>,
    organization: Option<Organization>,
    last_error: Option<String>,
    /// Bumped by every login and logout. Fetches started under an older value are dropped.
    generation: u64,
}

impl SessionState {
    fn anonymous() -> Self {
        Self {
            status: AuthStatus::Anonymous,
            session: None,
            identity: None,
            organization: None,
            last_error: None,
            generation: 0,
        }
    }
}

pub struct SessionController {
    api: Arc<dyn IdentityApi>,
    storage: SessionStorage,
    /// View used for the session record. Never drops a session that is still inside its timeout.
    sessions: SessionStorage,
    cache: CredentialCache,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    state: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("storage", &self.storage)
            .field("state", &*self.state.lock())
            .finish()
    }
}

impl SessionController {
    /// Builds the controller and rehydrates any persisted session.
    pub fn new(
        api: Arc<dyn IdentityApi>,
        storage: SessionStorage,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
    ) -> Self {
        let cache = CredentialCache::new(storage.clone(), config.cache_ttl);
        let sessions = storage.with_retention(storage.retention().max(config.session_timeout));
        let (events, _) = broadcast::channel(64);

        let controller = Self {
            api,
            storage,
            sessions,
            cache,
            clock,
            config,
            state: Mutex::new(SessionState::anonymous()),
            events,
        };
        controller.restore();
        controller
    }

    /// Loads the persisted token record. The identity stays unknown until `check_auth`.
    pub fn restore(&self) -> bool {
        let Some(envelope) = self.sessions.get::<StoredSession>(SESSION_KEY) else {
            return false;
        };

        tracing::debug!(token = %token_fingerprint(&envelope.payload.token), "restored persisted session");
        self.state.lock().session = Some(envelope.payload);
        true
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub async fn login(&self, email: &str, password: &str) -> AppResult<Identity> {
        if self.token().is_some() {
            self.logout(LogoutReason::UserRequested);
        }

        let generation = {
            let mut state = self.state.lock();
            state.generation += 1;
            state.status = AuthStatus::Checking;
            state.last_error = None;
            state.generation
        };

        let outcome = self.authenticate(email, password).await;

        let mut state = self.state.lock();
        if state.generation != generation {
            tracing::debug!(email = %email, "login superseded before completion");
            return Err(AppError::internal("login superseded by a newer session change"));
        }

        match outcome {
            Ok((token, identity, organization)) => {
                let session = StoredSession::start(token, self.clock.now(), self.config.session_timeout);
                self.sessions.set(SESSION_KEY, &session);
                self.cache.put(&session.token, &identity, &organization);

                tracing::info!(
                    user_id = %identity.id,
                    role = %identity.role,
                    company = %organization.name,
                    token = %token_fingerprint(&session.token),
                    "login succeeded"
                );

                state.session = Some(session);
                state.identity = Some(identity.clone());
                state.organization = Some(organization);
                state.status = AuthStatus::Authenticated;
                drop(state);

                self.emit(SessionEvent::LoggedIn {
                    user_id: identity.id.clone(),
                });
                Ok(identity)
            }
            Err(err) => {
                tracing::warn!(email = %email, code = err.code(), error = %err, "login failed");
                state.status = AuthStatus::Anonymous;
                state.last_error = Some(err.user_message());
                Err(err)
            }
        }
    }

    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> AppResult<(String, Identity, Organization)> {
        let token = self
            .api
            .login(email, password)
            .await
            .map_err(|err| match err {
                AppError::BadRequest(message) | AppError::Unauthorized(message) => {
                    AppError::invalid_credentials(message)
                }
                other => other,
            })?
            .access_token;

        let (identity, organization) = self.fetch_identity(&token).await?;
        Ok((token, identity, organization))
    }

    async fn fetch_identity(&self, token: &str) -> AppResult<(Identity, Organization)> {
        let (identity, organization) = tokio::try_join!(
            self.api.current_identity(token),
            self.api.my_organization(token)
        )?;

        if !identity.is_active {
            return Err(AppError::inactive_account(format!("user {} is inactive", identity.email)));
        }
        if !organization.is_active() {
            return Err(AppError::inactive_organization(format!(
                "company {} is {}, awaiting validation",
                organization.name,
                organization.status.as_str()
            )));
        }

        Ok((identity, organization))
    }

    /// Tears the session down. Safe to call repeatedly; only the call that actually
    /// removed something logs and emits `LoggedOut`.
    pub fn logout(&self, reason: LogoutReason) -> bool {
        let had_session = {
            let mut state = self.state.lock();
            state.generation += 1;
            let had = state.session.is_some() || state.identity.is_some();
            state.session = None;
            state.identity = None;
            state.organization = None;
            state.status = AuthStatus::Anonymous;
            had
        };

        self.sessions.remove(SESSION_KEY);
        self.cache.invalidate();

        if had_session {
            tracing::info!(reason = %reason, "session closed");
            self.emit(SessionEvent::LoggedOut { reason });
        }
        had_session
    }

    /// Decides whether the current session is usable, fetching identity data when needed.
    ///
    /// Only transient faults (network, 5xx) come back as `Err`; the session is kept and
    /// the status moves to `Error` so the caller can retry.
    pub async fn check_auth(&self, skip_cache: bool) -> AppResult<AuthCheck> {
        let now = self.clock.now();
        let (session, generation) = {
            let state = self.state.lock();
            (state.session.clone(), state.generation)
        };

        let Some(session) = session else {
            self.state.lock().status = AuthStatus::Anonymous;
            return Ok(AuthCheck::rejected(AuthReason::NoToken));
        };

        if !session.is_valid(now, self.config.session_timeout) {
            tracing::info!(
                idle_secs = (now - session.last_activity).num_seconds(),
                "session timed out"
            );
            self.logout(LogoutReason::SessionTimeout);
            return Ok(AuthCheck::rejected(AuthReason::SessionTimeout));
        }

        if !skip_cache {
            if let Some(hit) = self.cache.try_get(&session.token) {
                let mut state = self.state.lock();
                if state.generation == generation {
                    tracing::debug!(user_id = %hit.identity.id, "identity served from cache");
                    state.identity = Some(hit.identity);
                    state.organization = Some(hit.organization);
                    state.status = AuthStatus::Authenticated;
                    return Ok(AuthCheck::accepted(AuthReason::Cache));
                }
                return Ok(AuthCheck::rejected(AuthReason::Superseded));
            }
        }

        self.state.lock().status = AuthStatus::Checking;
        let fetched = self.fetch_identity(&session.token).await;

        let mut state = self.state.lock();
        if state.generation != generation {
            tracing::debug!("discarding identity fetch superseded by a session change");
            return Ok(AuthCheck::rejected(AuthReason::Superseded));
        }

        match fetched {
            Ok((identity, organization)) => {
                self.cache.put(&session.token, &identity, &organization);
                if let Some(active) = state.session.as_mut() {
                    active.touch(self.clock.now(), self.config.session_timeout);
                    self.sessions.set(SESSION_KEY, &*active);
                }
                state.identity = Some(identity);
                state.organization = Some(organization);
                state.status = AuthStatus::Authenticated;
                state.last_error = None;
                Ok(AuthCheck::accepted(AuthReason::FreshData))
            }
            Err(err) if err.is_transient() => {
                tracing::warn!(code = err.code(), error = %err, "identity fetch failed, keeping session");
                state.status = AuthStatus::Error;
                state.last_error = Some(err.user_message());
                Err(err)
            }
            Err(err) => {
                drop(state);
                tracing::warn!(code = err.code(), error = %err, "auth check failed");
                let message = err.user_message();
                self.logout(LogoutReason::AuthFailed);
                self.state.lock().last_error = Some(message.clone());
                Ok(AuthCheck::rejected(AuthReason::AuthFailed).with_error(message))
            }
        }
    }

    /// Stamps activity and pushes the expiry forward. No-op without a token.
    pub fn update_activity(&self) -> bool {
        let mut state = self.state.lock();
        let Some(session) = state.session.as_mut() else {
            return false;
        };
        session.touch(self.clock.now(), self.config.session_timeout);
        self.sessions.set(SESSION_KEY, &*session);
        true
    }

    pub fn extend_session(&self) -> bool {
        let extended = self.update_activity();
        if extended {
            tracing::debug!("session extended");
            self.emit(SessionEvent::SessionExtended);
        }
        extended
    }

    pub fn status(&self) -> AuthStatus {
        self.state.lock().status
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state.lock().identity.clone()
    }

    pub fn organization(&self) -> Option<Organization> {
        self.state.lock().organization.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.state
            .lock()
            .session
            .as_ref()
            .map(|session| session.token.clone())
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    pub fn clear_error(&self) {
        let mut state = self.state.lock();
        state.last_error = None;
        if state.status == AuthStatus::Error {
            state.status = if state.identity.is_some() {
                AuthStatus::Authenticated
            } else {
                AuthStatus::Anonymous
            };
        }
    }

    pub fn is_session_valid(&self) -> bool {
        let now = self.clock.now();
        self.state
            .lock()
            .session
            .as_ref()
            .is_some_and(|session| session.is_valid(now, self.config.session_timeout))
    }

    pub fn session_info(&self) -> Option<SessionInfo> {
        let now = self.clock.now();
        let state = self.state.lock();
        let session = state.session.as_ref()?;
        let deadline = session.deadline(self.config.session_timeout);

        Some(SessionInfo {
            issued_at: session.issued_at,
            last_activity: session.last_activity,
            deadline,
            remaining: deadline - now,
            valid: now < deadline,
        })
    }

    pub fn principal(&self) -> Option<Principal> {
        self.state
            .lock()
            .identity
            .as_ref()
            .map(|identity| Principal::new(identity.id.clone(), identity.role.clone()))
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.principal()
            .is_some_and(|principal| principal.has_role(&RoleId::new(role)))
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.principal()
            .is_some_and(|principal| principal.has_permission(permission))
    }

    pub fn role_data(&self) -> Option<&'static RoleDefinition> {
        self.principal()
            .and_then(|principal| authz::lookup(&principal.role))
    }

    pub fn role_name(&self) -> &'static str {
        self.role_data().map(|def| def.label).unwrap_or("Unknown")
    }

    pub fn dashboard_path(&self) -> &'static str {
        self.principal()
            .map(|principal| authz::dashboard_path(&principal.role))
            .unwrap_or(authz::DEFAULT_DASHBOARD)
    }

    pub fn save_intended_path(&self, path: &str) {
        self.storage.set(INTENDED_PATH_KEY, &path.to_string());
    }

    /// Returns the saved redirect target once, then forgets it.
    pub fn take_intended_path(&self) -> Option<String> {
        let path = self.storage.get::<String>(INTENDED_PATH_KEY)?;
        self.storage.remove(INTENDED_PATH_KEY);
        Some(path.payload)
    }

    pub fn save_current_path(&self, path: &str) {
        self.storage.set(CURRENT_PATH_KEY, &path.to_string());
    }

    pub fn current_path(&self) -> Option<String> {
        self.storage
            .get::<String>(CURRENT_PATH_KEY)
            .map(|envelope| envelope.payload)
    }

    pub async fn register_company(
        &self,
        company: CompanyDetails,
        manager: ManagerDetails,
    ) -> AppResult<CompanyRegistration> {
        self.clear_error();
        let request = CompanyRegistrationRequest::new(company, manager);

        match self.api.register_organization(&request).await {
            Ok(registration) => {
                tracing::info!(company_code = %registration.company_code, "company registered");
                Ok(registration)
            }
            Err(err) => {
                tracing::warn!(code = err.code(), error = %err, "company registration failed");
                self.state.lock().last_error = Some(err.user_message());
                Err(err)
            }
        }
    }

    pub async fn register_user(&self, request: SignupRequest) -> AppResult<Identity> {
        self.clear_error();

        match self.api.signup(&request).await {
            Ok(identity) => {
                tracing::info!(user_id = %identity.id, "user signed up");
                Ok(identity)
            }
            Err(err) => {
                tracing::warn!(code = err.code(), error = %err, "signup failed");
                self.state.lock().last_error = Some(err.user_message());
                Err(err)
            }
        }
    }
}
