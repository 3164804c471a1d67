//! Active-holder registry and contributions guard.

use std::time::Duration;

use slot_gate::Contributor;

use crate::support::fixture;

#[tokio::test]
async fn presence_lapses_without_deregistration() {
    let f = fixture();
    let presence = &f.gate.presence;

    presence
        .register("proj:1", "u9", Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(presence.count("proj:1").await.unwrap(), 1);

    f.clock.advance(Duration::from_secs(2));
    assert_eq!(presence.count("proj:1").await.unwrap(), 0);
}

#[tokio::test]
async fn presence_has_no_limit() {
    let f = fixture();
    let presence = &f.gate.presence;
    let ttl = f.gate.active_holder_ttl();
    for user in 0..50 {
        presence
            .register("proj:1", &format!("u{user}"), ttl)
            .await
            .unwrap();
    }
    assert_eq!(presence.count("proj:1").await.unwrap(), 50);
    assert_eq!(presence.count("proj:2").await.unwrap(), 0);
}

#[tokio::test]
async fn heartbeat_keeps_holder_active() {
    let f = fixture();
    let presence = &f.gate.presence;
    let ttl = Duration::from_secs(60);
    for _ in 0..5 {
        presence.register("proj:1", "u1", ttl).await.unwrap();
        f.clock.advance(Duration::from_secs(45));
        assert_eq!(presence.count("proj:1").await.unwrap(), 1);
    }
    f.clock.advance(Duration::from_secs(15));
    assert_eq!(presence.count("proj:1").await.unwrap(), 0);
}

#[tokio::test]
async fn served_task_is_stamped_until_ttl() {
    let f = fixture();
    let guard = &f.gate.guard;
    let volunteer = Contributor::user("42");

    assert!(!guard.check_task_stamped("99", &volunteer).await.unwrap());
    guard.stamp("99", &volunteer).await.unwrap();
    assert!(guard.check_task_stamped("99", &volunteer).await.unwrap());
    assert!(!guard
        .check_task_stamped("99", &Contributor::anonymous("10.1.1.1"))
        .await
        .unwrap());

    f.clock.advance(Duration::from_secs(60 * 60));
    assert!(!guard.check_task_stamped("99", &volunteer).await.unwrap());
}
