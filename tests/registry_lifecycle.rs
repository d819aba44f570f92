//! Registry lifecycle: composition-gated publishing across a sequence of
//! pushes, checks, and deletes.

use std::sync::Arc;

use graph_registry::composition::{FieldUse, NullCorpus, RecordedOperation, StaticCorpus};
use graph_registry::distribution::SnapshotStore;
use graph_registry::registry::{CheckOutcome, CheckRequest, PushOutcome, RegistryError};

mod common;
use common::{
    graph_ref, push_req, registry_with_store, ACCOUNTS_SDL, ACCOUNTS_WITHOUT_NAME_SDL,
    BROKEN_REVIEWS_SDL, REVIEWS_SDL,
};

#[tokio::test]
async fn test_push_sequence_gates_publication_on_composition() {
    let (registry, store) = registry_with_store(Arc::new(NullCorpus));
    let graph = graph_ref();

    // Push A (valid): configuration version becomes 1.
    let outcome = registry.push(&graph, push_req("accounts", ACCOUNTS_SDL)).await.unwrap();
    assert!(matches!(outcome, PushOutcome::Published { version: 1, .. }));

    // Push B (does not compose with A): registry lists both services, but
    // the active configuration remains version 1.
    let outcome = registry
        .push(&graph, push_req("reviews", BROKEN_REVIEWS_SDL))
        .await
        .unwrap();
    match outcome {
        PushOutcome::CompositionFailed { errors, active_version } => {
            assert!(!errors.is_empty());
            assert_eq!(active_version, Some(1));
        }
        other => panic!("expected composition failure, got {other:?}"),
    }
    let names: Vec<_> = registry
        .list(&graph)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(names, vec!["accounts", "reviews"]);

    let key = registry.storage_key(&graph);
    assert_eq!(store.head(&key).await.unwrap().unwrap().version, 1);

    // Push a corrected B: version 2, containing both services.
    let outcome = registry.push(&graph, push_req("reviews", REVIEWS_SDL)).await.unwrap();
    assert!(matches!(outcome, PushOutcome::Published { version: 2, .. }));

    let published = registry.published(&graph).await.unwrap();
    assert_eq!(published.version, 2);
    assert_eq!(published.services.len(), 2);
    assert!(published.schema.has_field("User", "reviews"));
    assert_eq!(store.head(&key).await.unwrap().unwrap().version, 2);
}

#[tokio::test]
async fn test_active_configuration_tracks_last_successful_composition() {
    let (registry, _) = registry_with_store(Arc::new(NullCorpus));
    let graph = graph_ref();

    registry.push(&graph, push_req("accounts", ACCOUNTS_SDL)).await.unwrap();
    let v1 = registry.published(&graph).await.unwrap();

    // A failing push never replaces the published snapshot.
    registry.push(&graph, push_req("reviews", BROKEN_REVIEWS_SDL)).await.unwrap();
    let still_v1 = registry.published(&graph).await.unwrap();
    assert_eq!(still_v1.id, v1.id);

    registry.push(&graph, push_req("reviews", REVIEWS_SDL)).await.unwrap();
    let v2 = registry.published(&graph).await.unwrap();
    assert_eq!(v2.version, 2);
    assert_ne!(v2.id, v1.id);
}

#[tokio::test]
async fn test_check_never_mutates_registry_or_configuration() {
    let (registry, store) = registry_with_store(Arc::new(NullCorpus));
    let graph = graph_ref();
    registry.push(&graph, push_req("accounts", ACCOUNTS_SDL)).await.unwrap();

    // Passing check: no mutation.
    let outcome = registry
        .check(&graph, CheckRequest { service: "reviews".into(), schema: REVIEWS_SDL.into() })
        .await
        .unwrap();
    assert!(matches!(outcome, CheckOutcome::Pass { .. }));

    // Failing check: also no mutation.
    let outcome = registry
        .check(&graph, CheckRequest { service: "reviews".into(), schema: BROKEN_REVIEWS_SDL.into() })
        .await
        .unwrap();
    assert!(matches!(outcome, CheckOutcome::CompositionFailed { .. }));

    let names: Vec<_> = registry
        .list(&graph)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(names, vec!["accounts"]);
    assert_eq!(registry.active_version(&graph).await, Some(1));

    let key = registry.storage_key(&graph);
    assert_eq!(store.head(&key).await.unwrap().unwrap().version, 1);
}

#[tokio::test]
async fn test_usage_failure_surfaces_in_check_but_not_push() {
    // A recorded operation still selects User.name.
    let corpus = Arc::new(StaticCorpus::new());
    corpus.record(
        "shop",
        "production",
        RecordedOperation {
            name: "GetViewer".into(),
            selects: vec![
                FieldUse { type_name: "Query".into(), field: "me".into() },
                FieldUse { type_name: "User".into(), field: "name".into() },
            ],
        },
    );

    let (registry, _) = registry_with_store(corpus);
    let graph = graph_ref();
    registry.push(&graph, push_req("accounts", ACCOUNTS_SDL)).await.unwrap();

    // The candidate drops User.name: composes fine, but check flags the
    // recorded operation.
    let outcome = registry
        .check(
            &graph,
            CheckRequest { service: "accounts".into(), schema: ACCOUNTS_WITHOUT_NAME_SDL.into() },
        )
        .await
        .unwrap();
    match outcome {
        CheckOutcome::UsageFailed { failures } => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].operation, "GetViewer");
            assert_eq!(failures[0].field, "name");
        }
        other => panic!("expected usage failure, got {other:?}"),
    }

    // Pushing the same candidate still succeeds at the registry level;
    // keeping it out of production is deployment policy, enforced by
    // running check first.
    let outcome = registry
        .push(&graph, push_req("accounts", ACCOUNTS_WITHOUT_NAME_SDL))
        .await
        .unwrap();
    assert!(matches!(outcome, PushOutcome::Published { version: 2, .. }));
}

#[tokio::test]
async fn test_delete_then_reuse_is_rejected() {
    let (registry, _) = registry_with_store(Arc::new(NullCorpus));
    let graph = graph_ref();

    registry.push(&graph, push_req("accounts", ACCOUNTS_SDL)).await.unwrap();
    registry.push(&graph, push_req("reviews", REVIEWS_SDL)).await.unwrap();
    registry.delete(&graph, "reviews").await.unwrap();

    let err = registry.push(&graph, push_req("reviews", REVIEWS_SDL)).await.unwrap_err();
    assert!(matches!(err, RegistryError::NameRetired(name) if name == "reviews"));

    // The surviving service still composes and republishes.
    assert_eq!(registry.active_version(&graph).await, Some(3));
}
