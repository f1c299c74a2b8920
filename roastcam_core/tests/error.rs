use std::error::Error;

use roastcam_core::mocks::{MemoryStore, layout_frame};
use roastcam_core::{LayoutRegions, PipelineCfg, RoastError, build_pipeline};
use roastcam_traits::{BoxError, Frame, FrameSource};

/// A camera that delivers one frame, then reports a failure.
struct FlakyCamera {
    sent: bool,
    failure: &'static str,
}

impl FrameSource for FlakyCamera {
    fn start(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
    fn stop(&mut self) {}
    fn current_frame(&mut self) -> Result<Frame, Box<dyn Error + Send + Sync>> {
        if self.sent {
            Err(self.failure.into())
        } else {
            self.sent = true;
            Ok(layout_frame(640, 480, [0, 0, 0], [90, 60, 40], [230, 230, 230]))
        }
    }
}

fn meter(failure: &'static str) -> roastcam_core::Pipeline<FlakyCamera, LayoutRegions, MemoryStore> {
    let mut m = build_pipeline(
        FlakyCamera {
            sent: false,
            failure,
        },
        LayoutRegions::for_buffer(640, 480),
        MemoryStore::default(),
        PipelineCfg::default(),
        None,
        None,
    )
    .expect("build");
    m.start().expect("start");
    m
}

#[test]
fn transient_frame_errors_map_to_capture() {
    let mut m = meter("short read");
    m.analyze_once().expect("first pass");
    let err = m.analyze_once().expect_err("second pass fails");
    match err.downcast_ref::<RoastError>() {
        Some(RoastError::Capture(msg)) => assert!(msg.contains("short read")),
        other => panic!("unexpected error variant: {other:?}"),
    }
}

#[test]
fn lost_device_maps_to_capture_unavailable() {
    let mut m = meter("device not found");
    m.analyze_once().expect("first pass");
    let err = m.measure(2, std::time::Duration::ZERO).expect_err("device gone");
    assert!(matches!(
        err.downcast_ref::<RoastError>(),
        Some(RoastError::CaptureUnavailable(_))
    ));
    assert!(m.log().is_empty());
}

#[test]
fn error_messages_are_human_readable() {
    let e = RoastError::InsufficientPoints {
        kind: "poly",
        needed: 5,
        got: 3,
    };
    assert_eq!(
        e.to_string(),
        "poly model needs at least 5 calibration points, got 3"
    );
    assert_eq!(RoastError::NoFrame.to_string(), "no usable frame data");
}
