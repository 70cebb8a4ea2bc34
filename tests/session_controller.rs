mod common;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Duration;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::Notify;

use common::{FakeApi, Harness};
use ferdi_session::authz::{permissions, Role};
use ferdi_session::cache::IDENTITY_CACHE_KEY;
use ferdi_session::errors::AppError;
use ferdi_session::models::{CompanyDetails, CompanyStatus, ManagerDetails};
use ferdi_session::session::{AuthReason, AuthStatus, LogoutReason, SessionEvent, SESSION_KEY};
use ferdi_session::storage::{KeyValueStore, MemoryStore};
use ferdi_session::SessionConfig;

#[tokio::test]
async fn login_active_admin_primes_cache() -> Result<()> {
    let h = Harness::new(FakeApi::active(Role::Admin));

    let identity = h.controller.login("manager@transport-bretagne.fr", "secret").await?;

    assert_eq!(identity.role.known(), Some(Role::Admin));
    assert_eq!(h.controller.status(), AuthStatus::Authenticated);
    assert!(h.controller.has_permission(permissions::USERS_MANAGE));
    assert!(h.controller.is_session_valid());
    assert!(h.store.get_raw(SESSION_KEY)?.is_some());
    assert!(h.store.get_raw(IDENTITY_CACHE_KEY)?.is_some());
    assert_eq!(h.api.fetches(), 1);

    // a restarted controller is served from the primed cache
    let reopened = h.reopen();
    assert!(reopened.identity().is_none());
    let check = reopened.check_auth(false).await?;
    assert!(check.authenticated);
    assert_eq!(check.reason, AuthReason::Cache);
    assert_eq!(h.api.fetches(), 1);
    assert_eq!(reopened.role_name(), "Administrator");
    Ok(())
}

#[tokio::test]
async fn suspended_company_is_rejected_at_login() -> Result<()> {
    let h = Harness::new(FakeApi::new(
        common::identity(Role::Admin),
        common::organization(CompanyStatus::Suspended),
    ));

    let err = h
        .controller
        .login("manager@transport-bretagne.fr", "secret")
        .await
        .err()
        .context("login should fail")?;

    assert!(matches!(err, AppError::InactiveOrganization(_)));
    assert!(err.user_message().contains("awaiting validation"));
    assert!(h.controller.token().is_none());
    assert!(!h.controller.is_session_valid());
    assert_eq!(h.controller.status(), AuthStatus::Anonymous);
    assert!(h.controller.last_error().is_some());
    assert!(h.store.get_raw(SESSION_KEY)?.is_none());
    Ok(())
}

#[tokio::test]
async fn inactive_user_is_rejected_at_login() -> Result<()> {
    let mut identity = common::identity(Role::Driver);
    identity.is_active = false;
    let h = Harness::new(FakeApi::new(identity, common::organization(CompanyStatus::Active)));

    let result = h.controller.login("driver@transport-bretagne.fr", "secret").await;

    assert!(matches!(result, Err(AppError::InactiveAccount(_))));
    assert!(h.controller.token().is_none());
    Ok(())
}

#[tokio::test]
async fn wrong_password_maps_to_invalid_credentials() -> Result<()> {
    let h = Harness::new(FakeApi::active(Role::Admin));
    *h.api.login_failure.lock() = Some(|| AppError::bad_request("Incorrect email or password"));

    let result = h.controller.login("manager@transport-bretagne.fr", "wrong").await;

    let err = result.err().context("login should fail")?;
    assert_eq!(err.code(), "invalid_credentials");
    assert_eq!(h.controller.status(), AuthStatus::Anonymous);
    assert_eq!(h.api.fetches(), 0);
    Ok(())
}

#[tokio::test]
async fn idle_session_times_out_and_clears_storage() -> Result<()> {
    let h = Harness::new(FakeApi::active(Role::Dispatcher));
    let mut events = h.controller.subscribe();
    h.controller.login("dispatch@transport-bretagne.fr", "secret").await?;

    h.clock.advance(Duration::hours(8) + Duration::minutes(1));
    let check = h.controller.check_auth(false).await?;

    assert!(!check.authenticated);
    assert_eq!(check.reason, AuthReason::SessionTimeout);
    assert!(h.controller.token().is_none());
    assert!(h.store.get_raw(SESSION_KEY)?.is_none());
    assert!(h.store.get_raw(IDENTITY_CACHE_KEY)?.is_none());

    assert!(matches!(events.try_recv()?, SessionEvent::LoggedIn { .. }));
    assert_eq!(
        events.try_recv()?,
        SessionEvent::LoggedOut {
            reason: LogoutReason::SessionTimeout
        }
    );
    Ok(())
}

#[tokio::test]
async fn timeout_wins_over_a_fresh_cache_entry() -> Result<()> {
    let config = SessionConfig {
        session_timeout: Duration::minutes(10),
        cache_ttl: Duration::minutes(30),
        ..SessionConfig::default()
    };
    let h = Harness::with_config(FakeApi::active(Role::Admin), config);
    h.controller.login("manager@transport-bretagne.fr", "secret").await?;

    // exactly at the timeout the session is over, even though the cache is 10 minutes old
    h.clock.advance(Duration::minutes(10));
    let check = h.controller.check_auth(false).await?;

    assert_eq!(check.reason, AuthReason::SessionTimeout);
    assert_eq!(h.api.fetches(), 1);
    Ok(())
}

#[tokio::test]
async fn second_check_within_ttl_is_served_from_cache() -> Result<()> {
    let h = Harness::new(FakeApi::active(Role::Accountant));
    h.controller.login("compta@transport-bretagne.fr", "secret").await?;

    // let the login-primed entry lapse so the first check must go remote
    h.clock.advance(Duration::minutes(31));

    let first = h.controller.check_auth(false).await?;
    assert_eq!(first.reason, AuthReason::FreshData);
    assert_eq!(h.api.fetches(), 2);

    h.clock.advance(Duration::minutes(5));
    let second = h.controller.check_auth(false).await?;
    assert_eq!(second.reason, AuthReason::Cache);
    assert!(second.authenticated);
    assert_eq!(h.api.fetches(), 2);

    let forced = h.controller.check_auth(true).await?;
    assert_eq!(forced.reason, AuthReason::FreshData);
    assert_eq!(h.api.fetches(), 3);
    Ok(())
}

#[tokio::test]
async fn storage_quota_errors_degrade_to_cache_misses() -> Result<()> {
    let store = Arc::new(MemoryStore::with_quota(8));
    let h = Harness::with_store(FakeApi::active(Role::Admin), store);

    h.controller.login("manager@transport-bretagne.fr", "secret").await?;
    assert!(h.store.is_empty());
    assert!(h.controller.is_session_valid());

    let check = h.controller.check_auth(false).await?;
    assert_eq!(check.reason, AuthReason::FreshData);
    assert_eq!(h.api.fetches(), 2);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn logout_is_idempotent() -> Result<()> {
    let h = Harness::new(FakeApi::active(Role::Admin));
    h.controller.login("manager@transport-bretagne.fr", "secret").await?;
    let mut events = h.controller.subscribe();

    let a = tokio::spawn({
        let controller = h.controller.clone();
        async move { controller.logout(LogoutReason::UserRequested) }
    });
    let b = tokio::spawn({
        let controller = h.controller.clone();
        async move { controller.logout(LogoutReason::UserRequested) }
    });
    let (a, b) = (a.await?, b.await?);

    assert!(a ^ b, "exactly one logout should have cleared the session");
    assert!(!h.controller.logout(LogoutReason::UserRequested));
    assert!(h.controller.identity().is_none());
    assert!(h.store.is_empty());

    assert!(matches!(events.try_recv()?, SessionEvent::LoggedOut { .. }));
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    Ok(())
}

#[tokio::test]
async fn activity_strictly_extends_the_session() -> Result<()> {
    let h = Harness::new(FakeApi::active(Role::Driver));
    h.controller.login("driver@transport-bretagne.fr", "secret").await?;
    let timeout = h.config.session_timeout;

    h.clock.advance(timeout - Duration::milliseconds(1));
    let before = h.controller.session_info().context("session info")?;
    assert!(h.controller.update_activity());
    let after = h.controller.session_info().context("session info")?;
    assert!(after.last_activity > before.last_activity);

    // the old deadline has passed, the new one has not
    h.clock.advance(Duration::milliseconds(1));
    assert!(h.controller.is_session_valid());

    // a stalled clock still moves activity forward
    assert!(h.controller.update_activity());
    let stalled = h.controller.session_info().context("session info")?;
    assert!(stalled.last_activity > after.last_activity);
    Ok(())
}

#[tokio::test]
async fn extend_session_emits_and_requires_a_token() -> Result<()> {
    let h = Harness::new(FakeApi::active(Role::Admin));
    assert!(!h.controller.extend_session());

    h.controller.login("manager@transport-bretagne.fr", "secret").await?;
    let mut events = h.controller.subscribe();
    assert!(h.controller.extend_session());
    assert_eq!(events.try_recv()?, SessionEvent::SessionExtended);
    Ok(())
}

#[tokio::test]
async fn intended_path_is_consumed_once() -> Result<()> {
    let h = Harness::new(FakeApi::active(Role::Admin));

    h.controller.save_intended_path("/dashboard/fleet");
    assert_eq!(h.controller.take_intended_path().as_deref(), Some("/dashboard/fleet"));
    assert_eq!(h.controller.take_intended_path(), None);
    Ok(())
}

#[tokio::test]
async fn transient_failure_keeps_the_session() -> Result<()> {
    let h = Harness::new(FakeApi::active(Role::Admin));
    h.controller.login("manager@transport-bretagne.fr", "secret").await?;
    h.api.fail_fetch_with(Some(|| AppError::network("connection refused")));

    let result = h.controller.check_auth(true).await;

    assert!(matches!(result, Err(AppError::Network(_))));
    assert_eq!(h.controller.status(), AuthStatus::Error);
    assert!(h.controller.token().is_some());
    assert_eq!(
        h.controller.last_error().as_deref(),
        Some("Unable to reach the server")
    );

    h.api.fail_fetch_with(None);
    let retried = h.controller.check_auth(true).await?;
    assert_eq!(retried.reason, AuthReason::FreshData);
    assert_eq!(h.controller.status(), AuthStatus::Authenticated);
    assert!(h.controller.last_error().is_none());
    Ok(())
}

#[tokio::test]
async fn rejected_token_tears_the_session_down() -> Result<()> {
    let h = Harness::new(FakeApi::active(Role::Admin));
    h.controller.login("manager@transport-bretagne.fr", "secret").await?;
    let mut events = h.controller.subscribe();
    h.api.fail_fetch_with(Some(|| AppError::unauthorized("Could not validate credentials")));

    let check = h.controller.check_auth(true).await?;

    assert!(!check.authenticated);
    assert_eq!(check.reason, AuthReason::AuthFailed);
    assert!(check.error.is_some());
    assert!(h.controller.token().is_none());
    assert_eq!(
        events.try_recv()?,
        SessionEvent::LoggedOut {
            reason: LogoutReason::AuthFailed
        }
    );
    Ok(())
}

#[tokio::test]
async fn fetch_superseded_by_logout_is_discarded() -> Result<()> {
    let h = Harness::new(FakeApi::active(Role::Admin));
    h.controller.login("manager@transport-bretagne.fr", "secret").await?;

    let notify = Arc::new(Notify::new());
    *h.api.hold.lock() = Some(notify.clone());

    let pending = tokio::spawn({
        let controller = h.controller.clone();
        async move { controller.check_auth(true).await }
    });
    while h.api.fetches() < 2 {
        tokio::task::yield_now().await;
    }

    h.controller.logout(LogoutReason::UserRequested);
    notify.notify_one();

    let check = pending.await??;
    assert_eq!(check.reason, AuthReason::Superseded);
    assert!(!check.authenticated);
    assert!(h.controller.identity().is_none());
    assert!(h.controller.token().is_none());
    assert!(h.store.get_raw(IDENTITY_CACHE_KEY)?.is_none());
    Ok(())
}

#[tokio::test]
async fn no_token_means_anonymous() -> Result<()> {
    let h = Harness::new(FakeApi::active(Role::Admin));

    let check = h.controller.check_auth(false).await?;

    assert_eq!(check.reason, AuthReason::NoToken);
    assert_eq!(h.controller.status(), AuthStatus::Anonymous);
    assert_eq!(h.api.fetches(), 0);
    assert!(!h.controller.has_permission(permissions::PROFILE_MANAGE));
    assert_eq!(h.controller.role_name(), "Unknown");
    Ok(())
}

#[tokio::test]
async fn driver_role_queries() -> Result<()> {
    let h = Harness::new(FakeApi::active(Role::Driver));
    h.controller.login("driver@transport-bretagne.fr", "secret").await?;

    assert!(h.controller.has_role("4"));
    assert!(h.controller.has_role("DRIVER"));
    assert!(!h.controller.has_role("2"));
    assert!(h.controller.has_permission(permissions::VEHICLE_CHECK));
    assert!(!h.controller.has_permission(permissions::USERS_MANAGE));
    assert_eq!(h.controller.role_name(), "Driver");
    assert_eq!(h.controller.dashboard_path(), "/dashboard/driver");
    Ok(())
}

#[tokio::test]
async fn registration_passes_through() -> Result<()> {
    let h = Harness::new(FakeApi::active(Role::Admin));

    let company = CompanyDetails {
        name: "Transport Bretagne".into(),
        siret: Some("12345678901234".into()),
        address: None,
        city: Some("Rennes".into()),
        postal_code: None,
        country: Some("France".into()),
        phone: None,
        email: None,
    };
    let manager = ManagerDetails {
        email: "manager@transport-bretagne.fr".into(),
        password: "secret".into(),
        first_name: "Jean".into(),
        last_name: "Dupont".into(),
        phone: None,
    };

    let registration = h.controller.register_company(company, manager).await?;
    assert_eq!(registration.company_code, "TB2024");
    assert!(h.controller.token().is_none());
    Ok(())
}

#[tokio::test]
async fn long_sessions_outlive_storage_retention() -> Result<()> {
    let config = SessionConfig {
        session_timeout: Duration::days(14),
        ..SessionConfig::default()
    };
    let h = Harness::with_config(FakeApi::active(Role::Admin), config);
    h.controller.login("manager@transport-bretagne.fr", "secret").await?;

    h.clock.advance(Duration::days(8));
    assert!(h.controller.is_session_valid());

    let reopened = h.reopen();
    let check = reopened.check_auth(false).await?;
    assert!(check.authenticated);
    assert_eq!(check.reason, AuthReason::FreshData);
    Ok(())
}

#[tokio::test]
async fn cached_identity_is_not_served_to_another_token() -> Result<()> {
    let h = Harness::new(FakeApi::active(Role::Admin));
    h.controller.login("manager@transport-bretagne.fr", "secret").await?;

    // a different token lands in the session record while the admin's cache entry lingers
    let raw = h.store.get_raw(SESSION_KEY)?.context("session persisted")?;
    let mut envelope: serde_json::Value = serde_json::from_str(&raw)?;
    envelope["payload"]["token"] = "token-of-the-driver".into();
    h.store.set_raw(SESSION_KEY, &envelope.to_string())?;
    *h.api.identity.lock() = common::identity(Role::Driver);

    let reopened = h.reopen();
    let check = reopened.check_auth(false).await?;
    assert_eq!(check.reason, AuthReason::FreshData);
    assert_eq!(reopened.role_name(), "Driver");
    Ok(())
}
