//! Session resolver behaviour against an in-memory identity provider.

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};

use common::FakeBackend;
use inventory_gate::identity::{IdentityError, SessionCredentials, SessionResolver};

fn creds(access: Option<&str>, refresh: Option<&str>) -> SessionCredentials {
    SessionCredentials { access_token: access.map(String::from), refresh_token: refresh.map(String::from) }
}

#[tokio::test]
async fn no_credentials_is_a_normal_outcome() {
    // even a dead provider is never consulted when there is nothing to check
    let resolver = SessionResolver::new(Arc::new(FakeBackend { identity_down: true, ..Default::default() }));
    let r = resolver.resolve(&creds(None, None)).await.unwrap();
    assert!(r.principal.is_none());
    assert!(!r.clear_cookies);
}

#[tokio::test]
async fn valid_token_resolves_to_principal() {
    let resolver = SessionResolver::new(Arc::new(FakeBackend::default().with_user("t", "u1")));
    let r = resolver.resolve(&creds(Some("t"), None)).await.unwrap();
    assert_eq!(r.principal.unwrap().user_id, "u1");
    assert!(r.rotated.is_none());
}

#[tokio::test]
async fn staleness_is_judged_at_resolution_time() {
    let resolver = SessionResolver::new(Arc::new(FakeBackend::default().with_user("t", "u1")));
    let later = Utc::now() + Duration::hours(2);
    let r = resolver.resolve_at(&creds(Some("t"), None), later).await.unwrap();
    assert!(r.principal.is_none());
    assert!(r.clear_cookies);
}

#[tokio::test]
async fn rejected_refresh_is_no_principal() {
    let resolver = SessionResolver::new(Arc::new(FakeBackend::default().with_expired_user("old", "u1")));
    let r = resolver.resolve(&creds(Some("old"), Some("unknown-refresh"))).await.unwrap();
    assert!(r.principal.is_none());
    assert!(r.rotated.is_none());
    assert!(r.clear_cookies);
}

#[tokio::test]
async fn refresh_only_credentials_can_restore_a_session() {
    let fake = FakeBackend::default().with_refresh("r1", "fresh", "r2").with_user("fresh", "u9");
    let resolver = SessionResolver::new(Arc::new(fake));
    let r = resolver.resolve(&creds(None, Some("r1"))).await.unwrap();
    assert_eq!(r.principal.unwrap().user_id, "u9");
    assert_eq!(r.rotated.unwrap().access_token, "fresh");
}

#[tokio::test]
async fn provider_outage_is_an_error_not_anonymous() {
    let resolver = SessionResolver::new(Arc::new(FakeBackend { identity_down: true, ..Default::default() }));
    let err = resolver.resolve(&creds(Some("t"), None)).await.unwrap_err();
    assert!(matches!(err, IdentityError::Unavailable(_)));
    let err = resolver.resolve(&creds(None, Some("r"))).await.unwrap_err();
    assert!(matches!(err, IdentityError::Unavailable(_)));
}
