#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Anything accepted must be fully finite and re-export to an accepted blob.
    let Ok(settings) = roastcam_core::parse_settings(data) else {
        return;
    };
    assert!(settings.gains.is_valid());
    assert!(settings.ccm.is_finite());
    assert!(settings.points.iter().all(|p| p.is_finite()));
    assert!(settings.formula.scale.is_finite() && settings.formula.offset.is_finite());
});
