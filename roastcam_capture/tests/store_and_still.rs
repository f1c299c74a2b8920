use roastcam_capture::{
    CaptureError, FileSettingsStore, Scene, SimulatedCamera, StillImageSource, encode_png,
    load_frame, save_png,
};
use roastcam_traits::{Frame, FrameSource, ScreenRect, SettingsStore};
use rstest::rstest;

fn small_frame() -> Frame {
    let mut cam = SimulatedCamera::new(
        32,
        24,
        Scene::new(
            ScreenRect::new(4.0, 4.0, 12.0, 12.0),
            ScreenRect::new(20.0, 2.0, 8.0, 4.0),
        ),
    );
    cam.start().unwrap();
    cam.current_frame().unwrap()
}

#[test]
fn settings_file_round_trip_and_clear() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("settings.json");
    let mut store = FileSettingsStore::new(&path);

    assert_eq!(store.load().unwrap(), None);
    store.save(br#"{"version":1}"#).unwrap();
    assert_eq!(store.load().unwrap().as_deref(), Some(&br#"{"version":1}"#[..]));
    assert!(!path.with_extension("new").exists(), "temp file left behind");

    store.save(b"{}").unwrap();
    assert_eq!(store.load().unwrap().as_deref(), Some(&b"{}"[..]));

    store.clear().unwrap();
    assert!(!path.exists());
    // clearing twice is fine
    store.clear().unwrap();
}

#[test]
fn png_snapshot_decodes_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snap.png");
    let frame = small_frame();
    save_png(&frame, &path).unwrap();

    let back = load_frame(&path).unwrap();
    assert_eq!(back, frame);

    let bytes = encode_png(&frame).unwrap();
    assert_eq!(&bytes[..4], b"\x89PNG");
}

#[rstest]
#[case::truncated(Frame::new(vec![0; 10], 4, 4))]
#[case::empty(Frame::new(Vec::new(), 0, 0))]
fn bad_buffers_are_rejected(#[case] frame: Frame) {
    let err = encode_png(&frame).unwrap_err();
    assert!(matches!(err, CaptureError::BadBuffer { .. }), "{err:?}");
}

#[test]
fn still_source_serves_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("still.png");
    let frame = small_frame();
    save_png(&frame, &path).unwrap();

    let mut src = StillImageSource::new(&path);
    assert!(src.current_frame().is_err());
    src.start().unwrap();
    assert_eq!(src.current_frame().unwrap(), frame);
    assert_eq!(src.current_frame().unwrap(), frame);
    src.stop();
    assert!(src.current_frame().is_err());
}

#[test]
fn missing_image_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let mut src = StillImageSource::new(dir.path().join("nope.png"));
    let err = src.start().unwrap_err();
    match err.downcast_ref::<CaptureError>() {
        Some(CaptureError::Unavailable(msg)) => assert!(msg.contains("not found")),
        other => panic!("expected Unavailable, got {other:?}"),
    }
}

#[test]
fn garbage_image_is_a_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("junk.png");
    std::fs::write(&path, b"not an image").unwrap();
    let err = load_frame(&path).unwrap_err();
    assert!(matches!(err, CaptureError::Decode(_)), "{err:?}");
}
