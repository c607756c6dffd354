use super::*;
use crate::camera::{BindingCall, SurfaceHandle};
use crate::config::UvcConfig;
use crate::events::SessionNotice;
use std::time::Duration;

async fn wait_for<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn test_orchestrator_creation() {
    let orchestrator = SessionOrchestrator::new(UvcConfig::default()).with_device_count(3);

    assert_eq!(orchestrator.config(), &UvcConfig::default());
    assert_eq!(orchestrator.device_count, 3);
    assert!(orchestrator.dispatch().is_none());
    assert!(!orchestrator.cancellation_token().is_cancelled());
}

#[tokio::test]
async fn test_headless_start_and_shutdown() {
    let mut orchestrator = SessionOrchestrator::new(UvcConfig::default());
    let camera = orchestrator.camera().clone();

    orchestrator.start().await.unwrap();
    assert!(orchestrator.dispatch().is_some());

    let started = wait_for(|| {
        camera
            .calls()
            .iter()
            .any(|c| matches!(c, BindingCall::StartStreaming { .. }))
    })
    .await;
    assert!(started, "headless mode should start streaming");
    assert!(camera.calls().contains(&BindingCall::BindDisplay {
        instance: 1,
        surface: SurfaceHandle::new(1),
    }));

    let exit_code = orchestrator.shutdown().await.unwrap();
    assert_eq!(exit_code, 0);
    assert_eq!(camera.open_instances(), 0);
    assert_eq!(
        camera.calls().last(),
        Some(&BindingCall::Release { instance: 1 })
    );
}

#[tokio::test]
async fn test_start_without_devices() {
    let mut orchestrator = SessionOrchestrator::new(UvcConfig::default()).with_device_count(0);
    let camera = orchestrator.camera().clone();

    orchestrator.start().await.unwrap();
    let exit_code = orchestrator.shutdown().await.unwrap();

    assert_eq!(exit_code, 0);
    assert!(camera.calls().is_empty());
}

#[tokio::test]
async fn test_start_twice_fails() {
    let mut orchestrator = SessionOrchestrator::new(UvcConfig::default()).with_device_count(0);

    orchestrator.start().await.unwrap();
    // The notice logger is the only subscriber
    assert_eq!(orchestrator.event_bus().subscriber_count(), 1);
    assert!(orchestrator.start().await.is_err());
    orchestrator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_selects_configured_device() {
    let mut config = UvcConfig::default();
    config.session.device_index = 1;
    let mut orchestrator = SessionOrchestrator::new(config).with_device_count(2);
    let camera = orchestrator.camera().clone();

    orchestrator.start().await.unwrap();
    let opened = wait_for(|| camera.open_instances() == 1).await;
    assert!(opened);
    assert!(camera.calls().contains(&BindingCall::Open {
        device_id: 2,
        instance: 1
    }));

    orchestrator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_notices_reach_subscribers() {
    let mut orchestrator = SessionOrchestrator::new(UvcConfig::default());
    let mut receiver = orchestrator.event_bus().subscribe();

    orchestrator.start().await.unwrap();

    let opened = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match receiver.recv().await {
                Ok(SessionNotice::CameraOpened { device_id, .. }) => return device_id,
                Ok(_) => continue,
                Err(e) => panic!("Notice stream ended: {}", e),
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(opened, 1);

    orchestrator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_run_exits_on_user_request() {
    let mut orchestrator = SessionOrchestrator::new(UvcConfig::default()).with_device_count(0);
    orchestrator.start().await.unwrap();

    // What the keyboard quit key does
    orchestrator.cancellation_token().cancel();

    let exit_code = orchestrator.run().await.unwrap();
    assert_eq!(exit_code, 0);
    assert!(orchestrator.session_worker.is_none());
}
