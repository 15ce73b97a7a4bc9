//! Fingerprint generation integration tests.

use forgeprint::{
    BrowserSpec, FingerprintGenerator, FingerprintOptions, ForgeprintError, HeaderOptions,
    Screen,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

mod unconstrained {
    use super::*;

    #[test]
    fn every_field_is_populated() {
        let generator = FingerprintGenerator::new().unwrap();
        for seed in 0..25 {
            let mut rng = StdRng::seed_from_u64(seed);
            let fingerprint = generator.generate_with_rng(&mut rng).unwrap();

            assert!(!fingerprint.navigator.user_agent.is_empty());
            assert!(!fingerprint.navigator.platform.is_empty());
            assert!(fingerprint.navigator.hardware_concurrency > 0);
            assert!(!fingerprint.navigator.languages.is_empty());
            assert!(fingerprint.screen.width > 0);
            assert!(fingerprint.screen.height > 0);
            assert!(fingerprint.screen.device_pixel_ratio > 0.0);
            assert!(!fingerprint.fonts.is_empty());
            assert!(!fingerprint.multimedia_devices.is_empty());
            assert!(!fingerprint.video_codecs.is_empty());
            assert!(!fingerprint.audio_codecs.is_empty());
            assert!(fingerprint.headers.user_agent().is_some());
        }
    }

    #[test]
    fn headers_and_navigator_share_one_user_agent() {
        let generator = FingerprintGenerator::new().unwrap();
        for seed in 0..25 {
            let mut rng = StdRng::seed_from_u64(seed);
            let fingerprint = generator.generate_with_rng(&mut rng).unwrap();
            assert_eq!(
                fingerprint.headers.user_agent(),
                Some(fingerprint.navigator.user_agent.as_str())
            );
        }
    }

    #[test]
    fn environment_is_consistent_with_the_browser_family() {
        let generator = FingerprintGenerator::new().unwrap();
        for seed in 0..40 {
            let mut rng = StdRng::seed_from_u64(seed);
            let fingerprint = generator.generate_with_rng(&mut rng).unwrap();
            let ua = fingerprint.navigator.user_agent.as_str();

            if ua.contains("Firefox") {
                assert_eq!(fingerprint.navigator.vendor, "");
                assert_eq!(fingerprint.navigator.product_sub, "20100101");
                assert!(fingerprint.navigator.oscpu.is_some());
                assert!(fingerprint.navigator.user_agent_data.is_none());
            } else if ua.contains("Chrome/") {
                assert_eq!(fingerprint.navigator.vendor, "Google Inc.");
                assert!(fingerprint.navigator.user_agent_data.is_some());
            }

            if ua.contains("Macintosh") {
                assert_eq!(fingerprint.navigator.platform, "MacIntel");
            } else if ua.contains("Windows NT") {
                assert_eq!(fingerprint.navigator.platform, "Win32");
            } else if ua.contains("iPhone") {
                assert_eq!(fingerprint.navigator.platform, "iPhone");
            }
        }
    }

    #[test]
    fn generation_is_deterministic_for_a_fixed_seed() {
        let generator = FingerprintGenerator::new().unwrap();
        for seed in 0..10 {
            let a = generator
                .generate_with_rng(&mut StdRng::seed_from_u64(seed))
                .unwrap();
            let b = generator
                .generate_with_rng(&mut StdRng::seed_from_u64(seed))
                .unwrap();
            assert_eq!(a, b);
        }
    }
}

mod screen_bounds {
    use super::*;

    #[test]
    fn sampled_geometry_stays_within_bounds() {
        let generator = FingerprintGenerator::with_options(FingerprintOptions {
            screen: Some(Screen {
                min_width: Some(100),
                max_width: Some(1280),
                min_height: Some(400),
                max_height: Some(720),
            }),
            ..FingerprintOptions::default()
        })
        .unwrap();
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let fingerprint = generator.generate_with_rng(&mut rng).unwrap();
            let screen = &fingerprint.screen;
            assert!((100..=1280).contains(&screen.width), "width {}", screen.width);
            assert!(
                (400..=720).contains(&screen.height),
                "height {}",
                screen.height
            );
        }
    }

    #[test]
    fn unsatisfiable_bounds_fail_in_strict_mode() {
        let generator = FingerprintGenerator::with_options(FingerprintOptions {
            screen: Some(Screen {
                min_width: Some(5000),
                ..Screen::default()
            }),
            strict: true,
            ..FingerprintOptions::default()
        })
        .unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            generator.generate_with_rng(&mut rng),
            Err(ForgeprintError::StrictGeneration)
        ));
    }

    #[test]
    fn unsatisfiable_bounds_relax_in_lenient_mode() {
        let generator = FingerprintGenerator::with_options(FingerprintOptions {
            screen: Some(Screen {
                min_width: Some(5000),
                ..Screen::default()
            }),
            ..FingerprintOptions::default()
        })
        .unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let fingerprint = generator.generate_with_rng(&mut rng).unwrap();
        assert!(fingerprint.screen.width > 0);
    }

    #[test]
    fn inverted_bounds_are_rejected_up_front() {
        let result = FingerprintGenerator::with_options(FingerprintOptions {
            screen: Some(Screen {
                min_width: Some(2000),
                max_width: Some(1000),
                ..Screen::default()
            }),
            ..FingerprintOptions::default()
        });
        assert!(matches!(result, Err(ForgeprintError::Validation(_))));
    }
}

mod languages {
    use super::*;

    #[test]
    fn navigator_languages_mirror_the_locale_constraint() {
        let generator = FingerprintGenerator::with_options(FingerprintOptions {
            headers: HeaderOptions {
                locales: vec!["de-DE".into(), "de".into(), "en".into()],
                ..HeaderOptions::default()
            },
            ..FingerprintOptions::default()
        })
        .unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let fingerprint = generator.generate_with_rng(&mut rng).unwrap();
        assert_eq!(fingerprint.navigator.languages, ["de-DE", "de", "en"]);
        assert_eq!(fingerprint.navigator.language, "de-DE");
    }
}

mod flags {
    use super::*;

    #[test]
    fn injection_flags_pass_through_untouched() {
        let generator = FingerprintGenerator::with_options(FingerprintOptions {
            mock_webrtc: true,
            slim: true,
            ..FingerprintOptions::default()
        })
        .unwrap();
        let mut rng = StdRng::seed_from_u64(8);
        let fingerprint = generator.generate_with_rng(&mut rng).unwrap();
        assert!(fingerprint.mock_webrtc);
        assert!(fingerprint.slim);
    }
}

mod serialization {
    use super::*;

    #[test]
    fn record_serializes_in_injection_shape() {
        let generator = FingerprintGenerator::with_options(FingerprintOptions {
            headers: HeaderOptions {
                browsers: vec![BrowserSpec::new("chrome")],
                ..HeaderOptions::default()
            },
            ..FingerprintOptions::default()
        })
        .unwrap();
        let mut rng = StdRng::seed_from_u64(21);
        let fingerprint = generator.generate_with_rng(&mut rng).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&fingerprint.to_json().unwrap()).unwrap();

        assert!(json["screen"]["availHeight"].is_i64());
        assert!(json["screen"]["hasHDR"].is_boolean());
        assert!(json["navigator"]["userAgent"].is_string());
        assert!(json["navigator"]["hardwareConcurrency"].is_u64());
        assert!(json["mockWebRTC"].is_boolean());
        assert!(json["headers"].is_object());
        assert!(json["videoCard"]["renderer"].is_string());
    }
}
