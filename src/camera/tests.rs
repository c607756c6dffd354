use super::*;
use crate::error::BindingError;
use std::time::Duration;

fn create_test_device(id: u32) -> UsbDevice {
    UsbDevice {
        id,
        vendor_id: 0x0c45,
        product_id: 12384,
        product_name: format!("USB Camera {}", id),
        device_name: format!("/dev/bus/usb/001/{:03}", id),
    }
}

fn create_test_format(width: u32, height: u32) -> PreviewFormat {
    PreviewFormat {
        resolution: Resolution::new(width, height),
        format: FrameFormat::Mjpeg,
        frame_rate_scale: 1.0,
    }
}

#[test]
fn test_device_label() {
    let device = create_test_device(4);
    assert_eq!(device.label(), "USB Camera 4 -> /dev/bus/usb/001/004");
}

#[tokio::test]
async fn test_simulated_open_and_release() {
    let camera = SimulatedCamera::default();
    let handle = ControlHandle::new(create_test_device(1), 42);

    let instance = camera.open(&handle).await.unwrap();
    assert_eq!(instance.device_id(), 1);
    assert_eq!(camera.open_instances(), 1);

    let id = instance.id();
    camera.release(instance).await;
    assert_eq!(camera.open_instances(), 0);
    assert_eq!(
        camera.calls(),
        vec![
            BindingCall::Open {
                device_id: 1,
                instance: id
            },
            BindingCall::Release { instance: id },
        ]
    );
}

#[tokio::test]
async fn test_simulated_open_rejects_invalid_descriptor() {
    let camera = SimulatedCamera::default();
    let handle = ControlHandle::new(create_test_device(2), -1);
    assert_eq!(handle.file_descriptor(), -1);

    let result = camera.open(&handle).await;
    assert!(matches!(result, Err(BindingError::Transport { .. })));
    assert_eq!(camera.open_instances(), 0);
    assert_eq!(
        camera.calls(),
        vec![BindingCall::OpenRejected { device_id: 2 }]
    );
}

#[tokio::test]
async fn test_simulated_open_failure_is_one_shot() {
    let camera = SimulatedCamera::default();
    let handle = ControlHandle::new(create_test_device(1), 42);

    camera.fail_next_open(BindingError::unsupported("no UVC interface"));
    let result = camera.open(&handle).await;
    assert!(matches!(result, Err(BindingError::Unsupported { .. })));
    assert_eq!(camera.open_instances(), 0);

    assert!(camera.open(&handle).await.is_ok());
    assert_eq!(camera.open_instances(), 1);
}

#[tokio::test]
async fn test_simulated_configure_rejects_unlisted_size() {
    let camera = SimulatedCamera::default();
    let handle = ControlHandle::new(create_test_device(1), 42);
    let mut instance = camera.open(&handle).await.unwrap();

    let result = camera
        .configure(&mut instance, &create_test_format(1920, 1080))
        .await;
    assert!(matches!(result, Err(BindingError::Unsupported { .. })));

    assert!(camera
        .configure(&mut instance, &create_test_format(640, 480))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_simulated_configure_rejects_bad_frame_rate_scale() {
    let camera = SimulatedCamera::new(Vec::new());
    let handle = ControlHandle::new(create_test_device(1), 42);
    let mut instance = camera.open(&handle).await.unwrap();

    let mut format = create_test_format(1920, 1080);
    format.frame_rate_scale = 0.0;
    let result = camera.configure(&mut instance, &format).await;
    assert!(matches!(result, Err(BindingError::InvalidArgument { .. })));
}

#[tokio::test]
async fn test_simulated_start_requires_configured_format() {
    let camera = SimulatedCamera::default();
    let handle = ControlHandle::new(create_test_device(1), 42);
    let mut instance = camera.open(&handle).await.unwrap();

    assert!(camera.start_streaming(&mut instance).await.is_err());

    camera
        .configure(&mut instance, &create_test_format(640, 480))
        .await
        .unwrap();
    assert!(camera.start_streaming(&mut instance).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_simulated_latency() {
    let camera = SimulatedCamera::default().with_latency(Duration::from_millis(250));
    let handle = ControlHandle::new(create_test_device(1), 42);

    let started = tokio::time::Instant::now();
    let instance = camera.open(&handle).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(250));
    camera.release(instance).await;
}
