use roastcam_core::error::BuildError;
use roastcam_core::mocks::{MemoryStore, ScriptedSource};
use roastcam_core::{LayoutRegions, PipelineCfg, RoastMeter, build_pipeline};
use roastcam_traits::Frame;
use rstest::rstest;

#[rstest]
fn builder_missing_source_yields_typed_build_error() {
    let err = RoastMeter::builder()
        // missing with_frame_source()
        .with_regions(LayoutRegions::for_buffer(640, 480))
        .try_build()
        .expect_err("should fail with MissingFrameSource");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingFrameSource) => {}
        other => panic!("expected MissingFrameSource, got: {other:?}"),
    }
}

#[rstest]
fn builder_missing_regions_yields_typed_build_error() {
    let err = RoastMeter::builder()
        .with_frame_source(ScriptedSource::constant(Frame::default()))
        .try_build()
        .expect_err("should fail with MissingRegions");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::MissingRegions)
    ));
}

#[rstest]
#[case::zero_stride(|c: &mut PipelineCfg| c.sampling.sample_stride = 0)]
#[case::alpha_zero(|c: &mut PipelineCfg| c.ema_alpha = 0.0)]
#[case::alpha_above_one(|c: &mut PipelineCfg| c.ema_alpha = 1.5)]
#[case::no_frames(|c: &mut PipelineCfg| c.measure.frames = 0)]
#[case::fraction_one(|c: &mut PipelineCfg| c.sampling.highlight_reject_fraction = 1.0)]
#[case::negative_ridge(|c: &mut PipelineCfg| c.fit.ridge_poly = -0.1)]
#[case::nan_scale(|c: &mut PipelineCfg| c.formula.scale = f64::NAN)]
#[case::negative_gate(|c: &mut PipelineCfg| c.gate_profile.glare_max = -1.0)]
#[case::blank_device(|c: &mut PipelineCfg| c.device_tag = "  ".into())]
fn invalid_config_is_rejected(#[case] tweak: fn(&mut PipelineCfg)) {
    let mut cfg = PipelineCfg::default();
    tweak(&mut cfg);
    let err = build_pipeline(
        ScriptedSource::constant(Frame::default()),
        LayoutRegions::for_buffer(640, 480),
        MemoryStore::default(),
        cfg,
        None,
        None,
    )
    .expect_err("config should be rejected");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::InvalidConfig(_))
    ));
}

#[test]
fn full_builder_starts_idle() {
    let meter = RoastMeter::builder()
        .with_frame_source(ScriptedSource::constant(Frame::default()))
        .with_regions(LayoutRegions::for_buffer(640, 480))
        .with_settings_store(MemoryStore::default())
        .build()
        .expect("build");
    assert_eq!(meter.state(), roastcam_core::PipelineState::Idle);
    assert!(meter.log().is_empty());
}
