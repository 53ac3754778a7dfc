use super::*;
use crate::nav::EDITOR_ROUTE;
use crate::provider::{AuthChangeEvent, ProviderError};
use crate::test_helpers::{FakeProvider, RecordingNavigator, active_session, settle};

fn mount(fake: &Arc<FakeProvider>, nav: &Arc<RecordingNavigator>) -> SessionWatcher {
    SessionWatcher::mount(Arc::<FakeProvider>::clone(fake), Arc::<RecordingNavigator>::clone(nav), EDITOR_ROUTE)
}

#[tokio::test]
async fn no_session_on_either_channel_does_not_navigate() {
    let fake = Arc::new(FakeProvider::new());
    let nav = Arc::new(RecordingNavigator::default());
    let watcher = mount(&fake, &nav);
    settle().await;

    assert!(nav.routes().is_empty());
    assert!(!watcher.has_navigated());
}

#[tokio::test]
async fn existing_session_navigates_via_initial_query() {
    let fake = Arc::new(FakeProvider::new());
    fake.store
        .set(AuthChangeEvent::SignedIn, Some(active_session("tok")))
        .await;
    let nav = Arc::new(RecordingNavigator::default());
    let watcher = mount(&fake, &nav);
    settle().await;

    assert_eq!(nav.routes(), vec![EDITOR_ROUTE.to_owned()]);
    assert!(watcher.has_navigated());
}

#[tokio::test]
async fn later_sign_in_navigates_via_notification() {
    let fake = Arc::new(FakeProvider::new());
    let nav = Arc::new(RecordingNavigator::default());
    let _watcher = mount(&fake, &nav);
    settle().await;
    assert!(nav.routes().is_empty());

    fake.emit_signed_in().await;
    settle().await;
    assert_eq!(nav.routes(), vec![EDITOR_ROUTE.to_owned()]);
}

#[tokio::test]
async fn both_channels_active_navigates_once() {
    let fake = Arc::new(FakeProvider::new().with_gated_query());
    fake.store
        .set(AuthChangeEvent::SignedIn, Some(active_session("tok")))
        .await;
    let nav = Arc::new(RecordingNavigator::default());
    let _watcher = mount(&fake, &nav);
    settle().await;

    // Notification wins the race; the query resolves afterwards.
    fake.emit_signed_in().await;
    settle().await;
    fake.release_query();
    settle().await;

    assert_eq!(nav.routes().len(), 1);
}

#[tokio::test]
async fn redundant_notifications_navigate_once() {
    let fake = Arc::new(FakeProvider::new());
    let nav = Arc::new(RecordingNavigator::default());
    let _watcher = mount(&fake, &nav);

    for _ in 0..3 {
        fake.emit_signed_in().await;
        settle().await;
    }
    fake.store
        .set(AuthChangeEvent::TokenRefreshed, Some(active_session("refreshed")))
        .await;
    settle().await;

    assert_eq!(nav.routes().len(), 1);
}

#[tokio::test]
async fn signed_out_notification_does_not_navigate() {
    let fake = Arc::new(FakeProvider::new());
    let nav = Arc::new(RecordingNavigator::default());
    let _watcher = mount(&fake, &nav);

    fake.store.set(AuthChangeEvent::SignedOut, None).await;
    settle().await;

    assert!(nav.routes().is_empty());
}

#[tokio::test]
async fn session_without_user_does_not_navigate() {
    let fake = Arc::new(FakeProvider::new());
    let mut anonymous = active_session("anon");
    anonymous.user = None;
    fake.store
        .set(AuthChangeEvent::SignedIn, Some(anonymous))
        .await;
    let nav = Arc::new(RecordingNavigator::default());
    let _watcher = mount(&fake, &nav);
    settle().await;

    assert!(nav.routes().is_empty());
}

#[tokio::test]
async fn failed_query_still_allows_notification() {
    let fake = Arc::new(FakeProvider::new());
    fake.fail_query(ProviderError::Request("offline".into()));
    let nav = Arc::new(RecordingNavigator::default());
    let _watcher = mount(&fake, &nav);
    settle().await;
    assert!(nav.routes().is_empty());

    fake.emit_signed_in().await;
    settle().await;
    assert_eq!(nav.routes().len(), 1);
}

#[tokio::test]
async fn unmount_releases_subscription() {
    let fake = Arc::new(FakeProvider::new());
    let nav = Arc::new(RecordingNavigator::default());
    let watcher = mount(&fake, &nav);
    assert_eq!(fake.store.subscriber_count(), 1);

    watcher.unmount();
    settle().await;
    assert_eq!(fake.store.subscriber_count(), 0);

    fake.emit_signed_in().await;
    settle().await;
    assert!(nav.routes().is_empty());
}

#[tokio::test]
async fn query_resolving_after_unmount_is_ignored() {
    let fake = Arc::new(FakeProvider::new().with_gated_query());
    fake.store
        .set(AuthChangeEvent::SignedIn, Some(active_session("tok")))
        .await;
    let nav = Arc::new(RecordingNavigator::default());
    let watcher = mount(&fake, &nav);
    settle().await;

    drop(watcher);
    fake.release_query();
    settle().await;

    assert!(nav.routes().is_empty());
}

#[tokio::test]
async fn each_mount_navigates_at_most_once() {
    let fake = Arc::new(FakeProvider::new());
    fake.store
        .set(AuthChangeEvent::SignedIn, Some(active_session("tok")))
        .await;
    let nav = Arc::new(RecordingNavigator::default());

    let first = mount(&fake, &nav);
    settle().await;
    first.unmount();

    let _second = mount(&fake, &nav);
    settle().await;

    assert_eq!(nav.routes().len(), 2);
}
