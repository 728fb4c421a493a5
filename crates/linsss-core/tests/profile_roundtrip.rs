//! Round-trip and robustness tests for the BSSRDF profile codec.

use linsss_core::bssrdf::{encode_profile, BssrdfProfile, MAX_GAUSS_LOBES};
use linsss_core::CoreError;
use proptest::prelude::*;

fn write_temp(bytes: &[u8], name: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("linsss-{}-{name}", std::process::id()));
    std::fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn profile_roundtrips_through_a_file() {
    let (w, h, n) = (3u32, 2u32, 2usize);
    let weights: Vec<f64> = (0..(w * h) as usize * n * 3)
        .map(|i| f64::from(i as u32) * 0.125)
        .collect();
    let betas = vec![1.0, 0.25, 0.0625, 4.0, 1.0, 0.5];
    let bytes = encode_profile(w, h, 31, &weights, &betas).unwrap();

    let path = write_temp(&bytes, "roundtrip.sss");
    let profile = BssrdfProfile::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(profile.width(), w);
    assert_eq!(profile.height(), h);
    assert_eq!(profile.ksize(), 31);
    assert_eq!(profile.n_gauss(), n);

    // Spot-check the row flip: the file's pixel (x=0, y=0, lobe 0) lands in
    // the texture's last row of the first lobe plane.
    let dst = ((h - 1) * w) as usize * 4;
    assert_eq!(profile.weights()[dst], 0.0);
    assert!((profile.weights()[dst + 1] - 0.125).abs() < 1e-6);
    assert_eq!(profile.weights()[dst + 3], 1.0);

    assert!((profile.sigmas()[1].x - 0.5).abs() < 1e-6);
}

#[test]
fn missing_file_is_an_io_error() {
    let err = BssrdfProfile::load("/nonexistent/linsss/profile.sss").unwrap_err();
    assert!(matches!(err, CoreError::IoError(_)));
}

#[test]
fn truncated_file_reports_expected_size() {
    let bytes = encode_profile(2, 2, 3, &vec![0.5; 2 * 2 * 3], &[1.0, 1.0, 1.0]).unwrap();
    let expected_len = bytes.len();
    let path = write_temp(&bytes[..bytes.len() - 4], "truncated.sss");
    let err = BssrdfProfile::load(&path).unwrap_err();
    std::fs::remove_file(&path).unwrap();
    match err {
        CoreError::ProfileTruncated { expected, actual } => {
            assert_eq!(expected, expected_len);
            assert_eq!(actual, expected_len - 4);
        }
        other => panic!("unexpected error: {other}"),
    }
}

proptest! {
    #[test]
    fn decoded_weights_are_never_negative(
        raw in prop::collection::vec(-10.0f64..10.0, 12),
        betas in prop::collection::vec(0.0f64..100.0, 3),
    ) {
        // 2x2, one lobe.
        let bytes = encode_profile(2, 2, 3, &raw, &betas).unwrap();
        let profile = BssrdfProfile::decode(&bytes).unwrap();
        for v in profile.weights() {
            prop_assert!(*v >= 0.0);
        }
    }

    #[test]
    fn sigmas_stay_in_derived_range(betas in prop::collection::vec(0.0f64..1.0e6, 3)) {
        let bytes = encode_profile(1, 1, 3, &[0.0; 3], &betas).unwrap();
        let profile = BssrdfProfile::decode(&bytes).unwrap();
        let s = profile.sigmas()[0];
        // beta floored at 1e-4 puts sigma in (0, 100].
        for ch in 0..3 {
            prop_assert!(s[ch] > 0.0 && s[ch] <= 100.0);
        }
    }

    #[test]
    fn lobe_counts_beyond_the_cap_are_rejected(extra in 1u32..8) {
        let n = (MAX_GAUSS_LOBES + extra) as usize;
        let result = encode_profile(1, 1, 3, &vec![0.0; n * 3], &vec![1.0; n * 3]);
        prop_assert!(
            matches!(result, Err(CoreError::TooManyLobes { .. })),
            "expected a lobe-cap rejection, got {result:?}",
        );
    }
}
