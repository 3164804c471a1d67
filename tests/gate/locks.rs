//! Resource lock manager: slot limits, expiry and the release grace period.

use std::time::Duration;

use slot_gate::{Config, LockError};

use crate::support::{fixture, fixture_with};

#[tokio::test]
async fn two_slots_release_and_grace_period() {
    let f = fixture();
    let locks = &f.gate.locks;

    assert!(locks.acquire("task:7", "A", 2).await.unwrap());
    assert!(locks.acquire("task:7", "B", 2).await.unwrap());
    assert!(!locks.acquire("task:7", "C", 2).await.unwrap());

    locks.release("task:7", "A").await.unwrap();

    // Released, but still counted while the grace period runs.
    f.clock.advance(Duration::from_secs(4));
    assert!(!locks.acquire("task:7", "C", 2).await.unwrap());

    f.clock.advance(Duration::from_secs(1));
    assert!(locks.acquire("task:7", "C", 2).await.unwrap());
    assert!(!locks.has_lock("task:7", "A").await.unwrap());
    assert!(locks.has_lock("task:7", "B").await.unwrap());
    assert!(locks.has_lock("task:7", "C").await.unwrap());
}

#[tokio::test]
async fn has_lock_on_unknown_resource_is_false() {
    let f = fixture();
    assert!(!f.gate.locks.has_lock("task:7", "Z").await.unwrap());
    assert!(f.gate.locks.list_holders("task:7").await.unwrap().is_empty());
}

#[tokio::test]
async fn repeated_acquire_counts_once() {
    let f = fixture();
    let locks = &f.gate.locks;
    for _ in 0..5 {
        assert!(locks.acquire("task:1", "A", 3).await.unwrap());
    }
    let holders = locks.list_holders("task:1").await.unwrap();
    assert_eq!(holders.len(), 1);

    // The other two slots are still free.
    assert!(locks.acquire("task:1", "B", 3).await.unwrap());
    assert!(locks.acquire("task:1", "C", 3).await.unwrap());
    assert!(!locks.acquire("task:1", "D", 3).await.unwrap());
}

#[tokio::test]
async fn at_most_limit_clients_hold_a_slot() {
    let f = fixture();
    let locks = &f.gate.locks;
    for limit in 1..=4 {
        let resource = format!("task:{limit}");
        for client in 0..10 {
            locks
                .acquire(&resource, &format!("client-{client}"), limit)
                .await
                .unwrap();
        }
        let mut holding = 0;
        for client in 0..10 {
            if locks
                .has_lock(&resource, &format!("client-{client}"))
                .await
                .unwrap()
            {
                holding += 1;
            }
        }
        assert_eq!(holding, limit);
    }
}

#[tokio::test]
async fn abandoned_slots_free_up_after_lock_duration() {
    let f = fixture_with(Config {
        lock_duration_secs: 30,
        ..Config::default()
    });
    let locks = &f.gate.locks;
    assert!(locks.acquire("task:1", "crashed", 1).await.unwrap());
    assert!(!locks.acquire("task:1", "next", 1).await.unwrap());

    f.clock.advance(Duration::from_secs(30));
    assert!(locks.acquire("task:1", "next", 1).await.unwrap());
}

#[tokio::test]
async fn reacquire_extends_the_slot() {
    let f = fixture_with(Config {
        lock_duration_secs: 30,
        ..Config::default()
    });
    let locks = &f.gate.locks;
    assert!(locks.acquire("task:1", "A", 1).await.unwrap());
    f.clock.advance(Duration::from_secs(20));
    assert!(locks.acquire("task:1", "A", 1).await.unwrap());
    f.clock.advance(Duration::from_secs(20));
    assert!(locks.has_lock("task:1", "A").await.unwrap());
    assert!(!locks.acquire("task:1", "B", 1).await.unwrap());
}

#[tokio::test]
async fn malformed_input_touches_nothing() {
    let f = fixture();
    let err = f.gate.locks.release("", "A").await.unwrap_err();
    assert!(matches!(err, LockError::InvalidInput(_)));
    assert!(f.store.is_empty());
}
