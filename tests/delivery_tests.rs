//! Delivery channel tests against a recording platform
mod common;

use common::RecordingPlatform;
use daily_spark::{
    DeliveryChannel, DeliveryChannelState, DeliveryResult, NotificationPayload, PermissionState,
};
use std::sync::Arc;

fn quote_payload() -> NotificationPayload {
    NotificationPayload::branded("Change starts with you.", Some("starred".to_string()))
}

#[tokio::test]
async fn test_registration_failure_uses_fallback() {
    let platform = Arc::new(RecordingPlatform::new(PermissionState::Granted, true));
    let channel = DeliveryChannel::new(platform.clone());

    assert_eq!(
        channel.initialize_background_handler().await,
        DeliveryChannelState::Error
    );
    assert_eq!(channel.request_permission().await, PermissionState::Granted);

    assert_eq!(channel.deliver(&quote_payload()).await, DeliveryResult::Foreground);
    assert_eq!(platform.direct_count(), 1);
    assert_eq!(platform.background_count(), 0);

    let shown = &platform.direct.lock().unwrap()[0];
    assert_eq!(shown.body, "Change starts with you.");
    assert_eq!(shown.icon.as_deref(), Some("starred"));
    assert!(shown.require_interaction);
}

#[tokio::test]
async fn test_background_handler_preferred() {
    let platform = Arc::new(RecordingPlatform::granting());
    let channel = DeliveryChannel::new(platform.clone());
    channel.initialize_background_handler().await;
    channel.request_permission().await;

    assert_eq!(channel.state(), DeliveryChannelState::Active);
    assert_eq!(channel.deliver(&quote_payload()).await, DeliveryResult::Background);
    assert_eq!(platform.background_count(), 1);
    assert_eq!(platform.direct_count(), 0);
}

#[tokio::test]
async fn test_denied_permission_suppresses_silently() {
    let platform = Arc::new(RecordingPlatform::new(PermissionState::Denied, false));
    let channel = DeliveryChannel::new(platform.clone());
    channel.initialize_background_handler().await;

    assert_eq!(channel.request_permission().await, PermissionState::Denied);
    for _ in 0..3 {
        assert_eq!(
            channel.deliver(&quote_payload()).await,
            DeliveryResult::Suppressed(PermissionState::Denied)
        );
    }
    assert_eq!(platform.total(), 0);
    // Only the explicit request prompted
    assert_eq!(platform.prompt_count(), 1);
}

#[tokio::test]
async fn test_permission_state_independent_of_channel_state() {
    let platform = Arc::new(RecordingPlatform::new(PermissionState::Default, true));
    let channel = DeliveryChannel::new(platform);

    assert_eq!(channel.permission(), PermissionState::Default);
    assert_eq!(channel.state(), DeliveryChannelState::Uninitialized);
    channel.initialize_background_handler().await;
    assert_eq!(channel.permission(), PermissionState::Default);
    assert_eq!(channel.state(), DeliveryChannelState::Error);
}
