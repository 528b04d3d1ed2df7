//! LinkService tests
//!
//! Creation defaults, validation, plan ceilings, token collisions and owner
//! scoping, over a process-local store.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};

use linkgate::config::{LinksConfig, PlansConfig};
use linkgate::errors::LinkgateError;
use linkgate::resolver::{Clock, LifecycleAuthority, LinkState};
use linkgate::services::{CreateLinkRequest, LinkService, PlanPolicy, PlanTier};
use linkgate::storage::{LinkStore, MemoryStore, ShortLink};
use linkgate::utils::TokenGenerator;
use linkgate::utils::password::verify_password;

// =============================================================================
// Test Setup
// =============================================================================

struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Hands out tokens from a queue, then repeats the last one
struct QueuedTokens(Mutex<VecDeque<String>>);

impl QueuedTokens {
    fn new(tokens: &[&str]) -> Arc<Self> {
        Arc::new(Self(Mutex::new(
            tokens.iter().map(|t| t.to_string()).collect(),
        )))
    }
}

impl TokenGenerator for QueuedTokens {
    fn generate(&self, _length: usize) -> String {
        let mut queue = self.0.lock().unwrap();
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap()
        }
    }
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn plans(pro_owners: &[&str]) -> PlanPolicy {
    PlanPolicy::from_config(&PlansConfig {
        free_max_clicks: 3,
        free_default_max_clicks: 3,
        pro_owners: pro_owners.iter().map(|o| o.to_string()).collect(),
    })
}

fn setup() -> (LinkService, Arc<dyn LinkStore>) {
    let store: Arc<dyn LinkStore> = Arc::new(MemoryStore::new(LifecycleAuthority::default()));
    let service = LinkService::new(store.clone(), plans(&["carol"]), &LinksConfig::default())
        .with_clock(Arc::new(FixedClock(t0())));
    (service, store)
}

fn request(target_url: &str) -> CreateLinkRequest {
    CreateLinkRequest {
        target_url: target_url.to_string(),
        ..CreateLinkRequest::default()
    }
}

fn validation_field(err: LinkgateError) -> &'static str {
    match err {
        LinkgateError::Validation { field, .. } => field,
        other => panic!("expected validation error, got {:?}", other),
    }
}

// =============================================================================
// Creation
// =============================================================================

#[tokio::test]
async fn test_create_applies_defaults() {
    let (service, store) = setup();

    let link = service
        .create_link("alice", request("https://example.com/a"))
        .await
        .unwrap();

    assert_eq!(link.token.len(), 10);
    assert_eq!(link.owner_id, "alice");
    assert_eq!(link.max_clicks, Some(3));
    assert_eq!(link.click_count, 0);
    assert!(link.active);
    assert_eq!(link.created_at, t0());
    assert!(link.expires_at.is_none());
    assert!(!link.is_phantom);

    let stored = store.get(&link.token).await.unwrap().unwrap();
    assert_eq!(stored.target_url, "https://example.com/a");
}

#[tokio::test]
async fn test_relative_times_use_service_clock() {
    let (service, _store) = setup();

    let link = service
        .create_link(
            "alice",
            CreateLinkRequest {
                reveal_at: Some("30m".to_string()),
                expires_at: Some("1d".to_string()),
                ..request("https://example.com/timed")
            },
        )
        .await
        .unwrap();

    assert_eq!(link.reveal_at, Some(t0() + Duration::minutes(30)));
    assert_eq!(link.expires_at, Some(t0() + Duration::days(1)));

    let details = service.get_link(&link.token, "alice").await.unwrap();
    assert_eq!(details.state, LinkState::Scheduled);
}

#[tokio::test]
async fn test_validation_failures_name_the_field() {
    let (service, store) = setup();

    let cases = [
        (request("javascript:alert(1)"), "target_url"),
        (request("not a url"), "target_url"),
        (
            CreateLinkRequest {
                max_clicks: Some(0),
                ..request("https://example.com")
            },
            "max_clicks",
        ),
        (
            CreateLinkRequest {
                expires_at: Some("2026-03-01T11:59:59Z".to_string()),
                ..request("https://example.com")
            },
            "expires_at",
        ),
        (
            CreateLinkRequest {
                expires_at: Some("2026-03-01T12:00:00Z".to_string()),
                ..request("https://example.com")
            },
            "expires_at",
        ),
        (
            CreateLinkRequest {
                reveal_at: Some("2h".to_string()),
                expires_at: Some("1h".to_string()),
                ..request("https://example.com")
            },
            "reveal_at",
        ),
        (
            CreateLinkRequest {
                reveal_at: Some("1h".to_string()),
                expires_at: Some("1h".to_string()),
                ..request("https://example.com")
            },
            "reveal_at",
        ),
        (
            CreateLinkRequest {
                expires_at: Some("tomorrow-ish".to_string()),
                ..request("https://example.com")
            },
            "expires_at",
        ),
        (
            CreateLinkRequest {
                label: Some("x".repeat(101)),
                ..request("https://example.com")
            },
            "label",
        ),
    ];

    for (req, field) in cases {
        let err = service.create_link("alice", req).await.unwrap_err();
        assert_eq!(validation_field(err), field);
    }

    let err = service
        .create_link("  ", request("https://example.com"))
        .await
        .unwrap_err();
    assert_eq!(validation_field(err), "owner_id");

    // 校验失败不落库
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_label_at_limit_is_accepted() {
    let (service, _store) = setup();

    let link = service
        .create_link(
            "alice",
            CreateLinkRequest {
                label: Some("é".repeat(100)),
                ..request("https://example.com")
            },
        )
        .await
        .unwrap();
    assert_eq!(link.label.map(|l| l.chars().count()), Some(100));
}

// =============================================================================
// Plans
// =============================================================================

#[tokio::test]
async fn test_plan_ceilings() {
    let (service, _store) = setup();

    let err = service
        .create_link(
            "alice",
            CreateLinkRequest {
                max_clicks: Some(4),
                ..request("https://example.com")
            },
        )
        .await
        .unwrap_err();
    assert_eq!(validation_field(err), "max_clicks");

    let free = service
        .create_link(
            "alice",
            CreateLinkRequest {
                max_clicks: Some(2),
                ..request("https://example.com")
            },
        )
        .await
        .unwrap();
    assert_eq!(free.max_clicks, Some(2));

    let pro_unlimited = service
        .create_link("carol", request("https://example.com"))
        .await
        .unwrap();
    assert_eq!(pro_unlimited.max_clicks, None);

    let pro_large = service
        .create_link(
            "carol",
            CreateLinkRequest {
                max_clicks: Some(10_000),
                ..request("https://example.com")
            },
        )
        .await
        .unwrap();
    assert_eq!(pro_large.max_clicks, Some(10_000));

    let details = service.get_link(&pro_large.token, "carol").await.unwrap();
    assert_eq!(details.plan, PlanTier::Pro);
}

#[tokio::test]
async fn test_phantom_always_gets_one_click() {
    let (service, _store) = setup();

    for owner in ["alice", "carol"] {
        let link = service
            .create_link(
                owner,
                CreateLinkRequest {
                    is_phantom: true,
                    max_clicks: Some(2),
                    ..request("https://example.com/once")
                },
            )
            .await
            .unwrap();
        assert!(link.is_phantom);
        assert_eq!(link.max_clicks, Some(1), "owner {}", owner);
    }
}

#[tokio::test]
async fn test_password_is_stored_hashed() {
    let (service, store) = setup();

    let link = service
        .create_link(
            "alice",
            CreateLinkRequest {
                password: Some("hunter2".to_string()),
                ..request("https://example.com/secret")
            },
        )
        .await
        .unwrap();

    let stored = store.get(&link.token).await.unwrap().unwrap();
    let hash = stored.password.unwrap();
    assert!(hash.starts_with("$argon2"));
    assert!(verify_password("hunter2", &hash));
    assert!(!verify_password("hunter3", &hash));
}

// =============================================================================
// Token allocation
// =============================================================================

#[tokio::test]
async fn test_token_collision_retries() {
    let (service, store) = setup();
    store
        .insert(&ShortLink {
            token: "Taken00001".to_string(),
            owner_id: "bob".to_string(),
            label: None,
            target_url: "https://example.com/bob".to_string(),
            active: true,
            created_at: t0(),
            expires_at: None,
            reveal_at: None,
            max_clicks: None,
            click_count: 0,
            is_phantom: false,
            password: None,
        })
        .await
        .unwrap();

    let service = service.with_generator(QueuedTokens::new(&["Taken00001", "Fresh00001"]));
    let link = service
        .create_link("alice", request("https://example.com/alice"))
        .await
        .unwrap();
    assert_eq!(link.token, "Fresh00001");

    // 原有链接不受影响
    let original = store.get("Taken00001").await.unwrap().unwrap();
    assert_eq!(original.owner_id, "bob");
}

#[tokio::test]
async fn test_token_exhaustion() {
    let (service, store) = setup();
    let service = service.with_generator(QueuedTokens::new(&["Always0001"]));

    service
        .create_link("alice", request("https://example.com/first"))
        .await
        .unwrap();

    let err = service
        .create_link("alice", request("https://example.com/second"))
        .await
        .unwrap_err();
    assert!(matches!(err, LinkgateError::TokenExhausted(_)), "{:?}", err);
    assert_eq!(store.count().await.unwrap(), 1);
}

// =============================================================================
// Owner scoping
// =============================================================================

#[tokio::test]
async fn test_owner_scoping() {
    let (service, store) = setup();
    let link = service
        .create_link("alice", request("https://example.com/mine"))
        .await
        .unwrap();

    assert!(matches!(
        service.get_link(&link.token, "mallory").await,
        Err(LinkgateError::NotFound(_))
    ));
    assert!(matches!(
        service.disable_link(&link.token, "mallory").await,
        Err(LinkgateError::NotFound(_))
    ));
    assert!(matches!(
        service.delete_link(&link.token, "mallory").await,
        Err(LinkgateError::NotFound(_))
    ));

    service.disable_link(&link.token, "alice").await.unwrap();
    let details = service.get_link(&link.token, "alice").await.unwrap();
    assert_eq!(details.state, LinkState::Disabled);

    service.delete_link(&link.token, "alice").await.unwrap();
    assert!(store.get(&link.token).await.unwrap().is_none());
    assert!(matches!(
        service.get_link(&link.token, "alice").await,
        Err(LinkgateError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_list_links_is_owner_scoped_and_paged() {
    let (service, store) = setup();
    for i in 0..5 {
        store
            .insert(&ShortLink {
                token: format!("Alice0000{}", i),
                owner_id: "alice".to_string(),
                label: None,
                target_url: format!("https://example.com/{}", i),
                active: true,
                created_at: t0() - Duration::minutes(10 - i),
                expires_at: (i == 0).then(|| t0() - Duration::minutes(1)),
                reveal_at: None,
                max_clicks: None,
                click_count: 0,
                is_phantom: false,
                password: None,
            })
            .await
            .unwrap();
    }
    service
        .create_link("mallory", request("https://example.com/other"))
        .await
        .unwrap();

    let first = service.list_links("alice", 1, 2).await.unwrap();
    assert_eq!(first.total, 5);
    assert_eq!(first.total_pages(), 3);
    let tokens: Vec<_> = first.links.iter().map(|d| d.link.token.as_str()).collect();
    assert_eq!(tokens, ["Alice00004", "Alice00003"]);
    assert!(first.links.iter().all(|d| d.link.owner_id == "alice"));

    let last = service.list_links("alice", 3, 2).await.unwrap();
    assert_eq!(last.links.len(), 1);
    assert_eq!(last.links[0].link.token, "Alice00000");
    assert_eq!(last.links[0].state, LinkState::Expired);

    let beyond = service.list_links("alice", 9, 2).await.unwrap();
    assert!(beyond.links.is_empty());
    assert_eq!(beyond.total, 5);

    // page 0 视为第一页，page_size 被夹到合法范围
    let clamped = service.list_links("alice", 0, 0).await.unwrap();
    assert_eq!((clamped.page, clamped.page_size), (1, 1));
    assert_eq!(clamped.links[0].link.token, "Alice00004");

    let others = service.list_links("mallory", 1, 100).await.unwrap();
    assert_eq!(others.total, 1);
    assert_eq!(others.links[0].state, LinkState::Active);

    assert_eq!(service.list_links("nobody", 1, 20).await.unwrap().total, 0);
}
