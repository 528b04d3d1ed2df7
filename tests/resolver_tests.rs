//! Token resolver tests
//!
//! Resolution properties against the in-memory store: quota exactness under
//! concurrency, prefetch safety, phantom one-shot, reveal/expiry windows.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use linkgate::errors::{LinkgateError, Result};
use linkgate::resolver::{
    AccessContext, AccessKind, BlockReason, Clock, ExternalSignal, LifecycleAuthority,
    RequestHeaders, RequestMetadata, ResolveOutcome, TokenResolver,
};
use linkgate::storage::{ConsumeOutcome, LinkStore, MemoryStore, ShortLink};
use linkgate::utils::password::hash_password;

// =============================================================================
// Test Setup
// =============================================================================

struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    fn at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self(Mutex::new(now)))
    }

    fn set(&self, now: DateTime<Utc>) {
        *self.0.lock().unwrap() = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn test_link(token: &str) -> ShortLink {
    ShortLink {
        token: token.to_string(),
        owner_id: "alice".to_string(),
        label: None,
        target_url: format!("https://{}.example.com/", token.to_lowercase()),
        active: true,
        created_at: t0() - Duration::days(1),
        expires_at: None,
        reveal_at: None,
        max_clicks: None,
        click_count: 0,
        is_phantom: false,
        password: None,
    }
}

async fn setup(
    link: ShortLink,
    authority: LifecycleAuthority,
) -> (Arc<MemoryStore>, TokenResolver, Arc<ManualClock>) {
    let store = Arc::new(MemoryStore::new(authority));
    store.insert(&link).await.unwrap();
    let clock = ManualClock::at(t0());
    let resolver = TokenResolver::new(store.clone()).with_clock(clock.clone());
    (store, resolver, clock)
}

fn real() -> RequestMetadata {
    RequestMetadata::default()
}

fn prefetch() -> RequestMetadata {
    RequestMetadata::from_headers(RequestHeaders::from_pairs([("Sec-Purpose", "prefetch")]))
}

async fn click_count(store: &MemoryStore, token: &str) -> i64 {
    store.get(token).await.unwrap().unwrap().click_count
}

fn is_redirect(outcome: &ResolveOutcome) -> bool {
    matches!(outcome, ResolveOutcome::Redirect { .. })
}

// =============================================================================
// Quota
// =============================================================================

#[tokio::test]
async fn test_three_clicks_then_quota_exceeded() {
    let link = ShortLink {
        max_clicks: Some(3),
        ..test_link("Quota3abc")
    };
    let (store, resolver, _) = setup(link, LifecycleAuthority::default()).await;

    for expected in 1..=3 {
        let outcome = resolver.resolve("Quota3abc", &real()).await;
        assert_eq!(
            outcome,
            ResolveOutcome::Redirect {
                target_url: "https://quota3abc.example.com/".to_string(),
                counted: true,
            }
        );
        assert_eq!(click_count(&store, "Quota3abc").await, expected);
    }

    let stored = store.get("Quota3abc").await.unwrap().unwrap();
    assert!(!stored.active, "third access must retire the link");

    assert_eq!(
        resolver.resolve("Quota3abc", &real()).await,
        ResolveOutcome::Blocked(BlockReason::QuotaExceeded)
    );
    assert_eq!(click_count(&store, "Quota3abc").await, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_accesses_never_exceed_quota() {
    const QUOTA: i64 = 5;
    const ACCESSES: usize = 64;

    let link = ShortLink {
        max_clicks: Some(QUOTA),
        ..test_link("RaceQuota")
    };
    let (store, resolver, _) = setup(link, LifecycleAuthority::default()).await;

    let handles: Vec<_> = (0..ACCESSES)
        .map(|_| {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.resolve("RaceQuota", &real()).await })
        })
        .collect();

    let mut granted = 0;
    let mut exceeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            ResolveOutcome::Redirect { counted: true, .. } => granted += 1,
            ResolveOutcome::Blocked(BlockReason::QuotaExceeded) => exceeded += 1,
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    assert_eq!(granted, QUOTA as usize);
    assert_eq!(exceeded, ACCESSES - QUOTA as usize);
    assert_eq!(click_count(&store, "RaceQuota").await, QUOTA);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_unlimited_link_counts_every_access() {
    let (store, resolver, _) = setup(test_link("Unlimited1"), LifecycleAuthority::default()).await;

    let handles: Vec<_> = (0..40)
        .map(|_| {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.resolve("Unlimited1", &real()).await })
        })
        .collect();
    for handle in handles {
        assert!(is_redirect(&handle.await.unwrap()));
    }

    assert_eq!(click_count(&store, "Unlimited1").await, 40);
}

// =============================================================================
// Speculative access
// =============================================================================

#[tokio::test]
async fn test_speculative_never_counts() {
    let link = ShortLink {
        max_clicks: Some(1),
        ..test_link("Prefetch1")
    };
    let (store, resolver, _) = setup(link, LifecycleAuthority::default()).await;

    for _ in 0..5 {
        assert_eq!(
            resolver.resolve("Prefetch1", &prefetch()).await,
            ResolveOutcome::Redirect {
                target_url: "https://prefetch1.example.com/".to_string(),
                counted: false,
            }
        );
    }
    assert_eq!(click_count(&store, "Prefetch1").await, 0);

    // 真实访问仍然拥有唯一的一次配额
    assert!(is_redirect(&resolver.resolve("Prefetch1", &real()).await));
    assert_eq!(click_count(&store, "Prefetch1").await, 1);

    assert_eq!(
        resolver.resolve("Prefetch1", &prefetch()).await,
        ResolveOutcome::Blocked(BlockReason::QuotaExceeded)
    );
    assert_eq!(click_count(&store, "Prefetch1").await, 1);
}

#[tokio::test]
async fn test_every_prefetch_marker_is_speculative() {
    let (store, resolver, _) = setup(test_link("Markers12"), LifecycleAuthority::default()).await;

    let markers: [(&str, &str); 5] = [
        ("purpose", "prefetch"),
        ("sec-purpose", "prefetch;prerender"),
        ("next-router-prefetch", "1"),
        ("x-middleware-prefetch", "1"),
        ("sec-fetch-mode", "no-cors"),
    ];
    for (name, value) in markers {
        let request = RequestMetadata::from_headers(RequestHeaders::from_pairs([(name, value)]));
        let outcome = resolver.resolve("Markers12", &request).await;
        assert_eq!(
            outcome.external(),
            ExternalSignal::Redirect {
                target_url: "https://markers12.example.com/".to_string(),
                kind: AccessKind::Speculative,
            },
            "{} should be speculative",
            name
        );
    }

    let head = RequestMetadata {
        is_head: true,
        ..RequestMetadata::default()
    };
    assert!(matches!(
        resolver.resolve("Markers12", &head).await,
        ResolveOutcome::Redirect { counted: false, .. }
    ));

    assert_eq!(click_count(&store, "Markers12").await, 0);
}

#[tokio::test]
async fn test_head_counts_when_configured_real() {
    let (store, resolver, _) = setup(test_link("HeadReal1"), LifecycleAuthority::default()).await;
    let resolver = resolver.with_head_is_speculative(false);

    let head = RequestMetadata {
        is_head: true,
        ..RequestMetadata::default()
    };
    assert!(matches!(
        resolver.resolve("HeadReal1", &head).await,
        ResolveOutcome::Redirect { counted: true, .. }
    ));
    assert_eq!(click_count(&store, "HeadReal1").await, 1);
}

// =============================================================================
// Phantom links
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_phantom_grants_exactly_one_access() {
    let link = ShortLink {
        is_phantom: true,
        max_clicks: Some(1),
        ..test_link("Phantom01")
    };
    let (store, resolver, _) = setup(link, LifecycleAuthority::default()).await;

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.resolve("Phantom01", &real()).await })
        })
        .collect();

    let mut granted = 0;
    for handle in handles {
        if is_redirect(&handle.await.unwrap()) {
            granted += 1;
        }
    }
    assert_eq!(granted, 1);

    // 之后永远被拒绝
    for _ in 0..3 {
        assert_eq!(
            resolver.resolve("Phantom01", &real()).await.external(),
            ExternalSignal::Blocked
        );
    }

    let stored = store.get("Phantom01").await.unwrap().unwrap();
    assert!(!stored.active);
    assert_eq!(stored.click_count, 1);
}

#[tokio::test]
async fn test_phantom_row_deleted_when_configured() {
    let link = ShortLink {
        is_phantom: true,
        max_clicks: Some(1),
        ..test_link("Phantom02")
    };
    let (store, resolver, _) = setup(link, LifecycleAuthority::new(true)).await;

    assert!(is_redirect(&resolver.resolve("Phantom02", &real()).await));
    assert!(store.get("Phantom02").await.unwrap().is_none());

    assert_eq!(
        resolver.resolve("Phantom02", &real()).await,
        ResolveOutcome::Blocked(BlockReason::NotFound)
    );
}

// =============================================================================
// Time windows
// =============================================================================

#[tokio::test]
async fn test_reveal_boundary_is_inclusive() {
    let reveal_at = t0() + Duration::hours(1);
    let link = ShortLink {
        reveal_at: Some(reveal_at),
        ..test_link("Reveal001")
    };
    let (store, resolver, clock) = setup(link, LifecycleAuthority::default()).await;

    for request in [real(), prefetch()] {
        let outcome = resolver.resolve("Reveal001", &request).await;
        assert_eq!(
            outcome,
            ResolveOutcome::Blocked(BlockReason::NotYetAvailable { reveal_at })
        );
        assert_eq!(
            outcome.external(),
            ExternalSignal::NotYetAvailable {
                reveal_at: Some(reveal_at)
            }
        );
    }
    assert_eq!(click_count(&store, "Reveal001").await, 0);

    clock.set(reveal_at - Duration::seconds(1));
    assert!(!is_redirect(&resolver.resolve("Reveal001", &real()).await));

    clock.set(reveal_at);
    assert!(is_redirect(&resolver.resolve("Reveal001", &real()).await));
    assert_eq!(click_count(&store, "Reveal001").await, 1);
}

#[tokio::test]
async fn test_expired_link_never_increments() {
    let link = ShortLink {
        expires_at: Some(t0() - Duration::minutes(5)),
        max_clicks: Some(10),
        ..test_link("Expired01")
    };
    let (store, resolver, _) = setup(link, LifecycleAuthority::default()).await;

    for _ in 0..3 {
        assert_eq!(
            resolver.resolve("Expired01", &real()).await,
            ResolveOutcome::Blocked(BlockReason::Expired)
        );
    }

    let stored = store.get("Expired01").await.unwrap().unwrap();
    assert_eq!(stored.click_count, 0);
    // 过期不是消费事件，不改写 active
    assert!(stored.active);
}

#[tokio::test]
async fn test_expiry_boundary_is_inclusive() {
    let link = ShortLink {
        expires_at: Some(t0() + Duration::minutes(1)),
        ..test_link("Expiring1")
    };
    let (_, resolver, clock) = setup(link, LifecycleAuthority::default()).await;

    assert!(is_redirect(&resolver.resolve("Expiring1", &real()).await));
    clock.set(t0() + Duration::minutes(1));
    assert_eq!(
        resolver.resolve("Expiring1", &real()).await,
        ResolveOutcome::Blocked(BlockReason::Expired)
    );
}

// =============================================================================
// Information hiding, owner disable, passwords
// =============================================================================

#[tokio::test]
async fn test_unknown_token_looks_like_expired() {
    let link = ShortLink {
        expires_at: Some(t0() - Duration::minutes(5)),
        ..test_link("Expired02")
    };
    let (_, resolver, _) = setup(link, LifecycleAuthority::default()).await;

    let expired = resolver.resolve("Expired02", &real()).await.external();
    let unknown = resolver.resolve("NoSuchTok", &real()).await.external();
    let malformed = resolver.resolve("../etc/passwd", &real()).await.external();

    assert_eq!(expired, ExternalSignal::Blocked);
    assert_eq!(unknown, expired);
    assert_eq!(malformed, expired);
}

#[tokio::test]
async fn test_owner_disable_overrides_everything() {
    let link = ShortLink {
        reveal_at: Some(t0() + Duration::hours(1)),
        ..test_link("Disabled1")
    };
    let (store, resolver, _) = setup(link, LifecycleAuthority::default()).await;

    assert!(store.disable("Disabled1", "alice").await.unwrap());

    for request in [real(), prefetch()] {
        assert_eq!(
            resolver.resolve("Disabled1", &request).await,
            ResolveOutcome::Blocked(BlockReason::Disabled)
        );
    }
}

#[tokio::test]
async fn test_password_gates_after_quota() {
    let link = ShortLink {
        password: Some(hash_password("s3cret").unwrap()),
        max_clicks: Some(2),
        ..test_link("Password1")
    };
    let (store, resolver, _) = setup(link, LifecycleAuthority::default()).await;

    assert_eq!(
        resolver.resolve("Password1", &real()).await,
        ResolveOutcome::Blocked(BlockReason::PasswordRequired)
    );
    assert_eq!(
        resolver
            .resolve("Password1", &real().with_password("wrong"))
            .await,
        ResolveOutcome::Blocked(BlockReason::PasswordRequired)
    );
    assert_eq!(click_count(&store, "Password1").await, 0);

    assert!(is_redirect(
        &resolver
            .resolve("Password1", &real().with_password("s3cret"))
            .await
    ));
    assert_eq!(click_count(&store, "Password1").await, 1);
}

// =============================================================================
// Store failures
// =============================================================================

/// Store whose every operation fails
struct BrokenStore;

#[async_trait]
impl LinkStore for BrokenStore {
    fn backend_name(&self) -> &'static str {
        "broken"
    }

    async fn get(&self, _token: &str) -> Result<Option<ShortLink>> {
        Err(LinkgateError::transient_store("connection reset"))
    }

    async fn insert(&self, _link: &ShortLink) -> Result<()> {
        Err(LinkgateError::transient_store("connection reset"))
    }

    async fn resolve_and_consume(
        &self,
        _token: &str,
        _now: DateTime<Utc>,
        _access: &AccessContext,
    ) -> ConsumeOutcome {
        ConsumeOutcome::Blocked(BlockReason::TransientError)
    }

    async fn disable(&self, _token: &str, _owner_id: &str) -> Result<bool> {
        Err(LinkgateError::transient_store("connection reset"))
    }

    async fn delete(&self, _token: &str, _owner_id: &str) -> Result<bool> {
        Err(LinkgateError::transient_store("connection reset"))
    }

    async fn list_by_owner(
        &self,
        _owner_id: &str,
        _page: u64,
        _page_size: u64,
    ) -> Result<(Vec<ShortLink>, u64)> {
        Err(LinkgateError::transient_store("connection reset"))
    }

    async fn count(&self) -> Result<u64> {
        Err(LinkgateError::transient_store("connection reset"))
    }
}

#[tokio::test]
async fn test_store_failure_is_a_generic_block() {
    let resolver = TokenResolver::new(Arc::new(BrokenStore));

    for request in [
        real(),
        prefetch(),
        real().with_password("anything"),
    ] {
        let outcome = resolver.resolve("AnyToken1", &request).await;
        assert_eq!(outcome, ResolveOutcome::Blocked(BlockReason::TransientError));
        assert_eq!(outcome.external(), ExternalSignal::Blocked);
    }
}
