//! Config Validation Tests
//!
//! Typo detection (unknown keys with suggestions) and range validation for
//! the node TOML config, exercised independently from the pipeline.

use std::io::Write;

use tl_detector::config::validation::{
    known_config_keys, suggest_correction, validate_ranges, validate_unknown_keys,
};
use tl_detector::config::{ConfigError, NodeConfig, TransformFallback};

// ============================================================================
// Typo Detection Tests
// ============================================================================

#[test]
fn typo_in_threshold_warns_with_suggestion() {
    let toml_str = r#"
[detector]
state_count_treshold = 4
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert!(warnings[0].field.contains("state_count_treshold"));
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("detector.state_count_threshold"),
        "Should suggest the correct spelling"
    );
}

#[test]
fn transposed_letters_in_camera_key_are_suggested() {
    let toml_str = r#"
[camera]
focal_lenght_x = 1000.0
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].suggestion.as_deref(), Some("camera.focal_length_x"));
}

#[test]
fn typo_inside_map_light_entry_warns() {
    let toml_str = r#"
[[map.lights]]
x = 10.0
y = 2.0
zz = 5.8
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].field, "map.lights.zz");
    assert_eq!(warnings[0].suggestion.as_deref(), Some("map.lights.z"));
}

#[test]
fn valid_config_produces_zero_warnings() {
    let toml_str = r#"
[node]
name = "tl-detector-test"

[detector]
state_count_threshold = 3
lookahead_waypoints = 150
transform_fallback = "skip_frame"
missing_input_log_interval = 20

[classifier]
kind = "color"
warmup_secs = 0.5
min_pixel_fraction = 0.05
min_value = 120.0

[camera]
focal_length_x = 1345.2
focal_length_y = 1353.8
image_width = 800
image_height = 600
mounting_height_m = 1.6
crop_width = 64
crop_height = 128

[route]
closed_loop = true

[[map.lights]]
x = 1148.56
y = 1184.65
z = 5.8

[[map.lights]]
x = 1559.2
y = 1158.43
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert!(
        warnings.is_empty(),
        "Valid config should produce zero warnings, got: {:?}",
        warnings.iter().map(|w| &w.field).collect::<Vec<_>>()
    );
}

#[test]
fn completely_unknown_key_has_no_suggestion() {
    let toml_str = r#"
[detector]
zzzzzzzzzzzzzzzzzzz = 1
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1);
    assert!(
        warnings[0].suggestion.is_none(),
        "Totally unknown key should have no suggestion"
    );
}

#[test]
fn unknown_section_warns() {
    let warnings = validate_unknown_keys("[lidar]\nrange_m = 80.0\n");
    let fields: Vec<_> = warnings.iter().map(|w| w.field.as_str()).collect();
    assert!(fields.contains(&"lidar"));
    assert!(fields.contains(&"lidar.range_m"));
}

#[test]
fn malformed_toml_is_left_to_the_parser() {
    assert!(validate_unknown_keys("[detector\nstate_count_threshold = ").is_empty());
}

#[test]
fn suggest_correction_prefers_closest_key() {
    let known = known_config_keys();
    assert_eq!(
        suggest_correction("route.closed_lop", &known).as_deref(),
        Some("route.closed_loop")
    );
    assert_eq!(suggest_correction("entirely.different.section", &known), None);
}

#[test]
fn every_default_field_is_a_known_key() {
    let rendered = NodeConfig::default().to_toml().unwrap();
    let warnings = validate_unknown_keys(&rendered);
    assert!(
        warnings.is_empty(),
        "Serialized defaults must round-trip without warnings: {:?}",
        warnings.iter().map(|w| &w.field).collect::<Vec<_>>()
    );
}

// ============================================================================
// Range Validation Tests
// ============================================================================

#[test]
fn defaults_pass_validation() {
    let config = NodeConfig::default();
    assert!(validate_ranges(&config).is_empty());
    assert!(config.validate().is_ok());
}

#[test]
fn zero_threshold_is_rejected() {
    let mut config = NodeConfig::default();
    config.detector.state_count_threshold = 0;

    match config.validate() {
        Err(ConfigError::Validation(errors)) => {
            assert!(errors.iter().any(|e| e.contains("state_count_threshold")));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn zero_lookahead_is_rejected() {
    let mut config = NodeConfig::default();
    config.detector.lookahead_waypoints = 0;
    assert!(config.validate().is_err());
}

#[test]
fn non_positive_focal_length_is_rejected() {
    let mut config = NodeConfig::default();
    config.camera.focal_length_x = 0.0;
    config.camera.focal_length_y = -10.0;

    let errors = validate_ranges(&config);
    assert_eq!(errors.len(), 2, "both focal lengths should be flagged: {errors:?}");
    assert!(errors[0].contains("camera.focal_length_x"));
    assert!(errors[1].contains("camera.focal_length_y"));
}

#[test]
fn negative_warmup_and_bad_fraction_are_rejected() {
    let mut config = NodeConfig::default();
    config.classifier.warmup_secs = -1.0;
    config.classifier.min_pixel_fraction = 1.5;

    let errors = validate_ranges(&config);
    assert!(errors.iter().any(|e| e.contains("warmup_secs")));
    assert!(errors.iter().any(|e| e.contains("min_pixel_fraction")));
}

#[test]
fn zero_crop_size_is_rejected() {
    let mut config = NodeConfig::default();
    config.camera.crop_height = 0;
    assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
}

#[test]
fn nan_light_coordinate_is_rejected() {
    let toml_str = "[[map.lights]]\nx = nan\ny = 1.0\n";
    let err = NodeConfig::from_toml_str(toml_str).unwrap_err();
    assert!(err.to_string().contains("map.lights[0]"), "got: {err}");
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn load_from_file_applies_values_and_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[detector]
state_count_threshold = 5
transform_fallback = "skip_frame"

[[map.lights]]
x = 20.0
y = -3.0
"#
    )
    .unwrap();

    let config = NodeConfig::load_from_file(file.path()).unwrap();
    assert_eq!(config.detector.state_count_threshold, 5);
    assert_eq!(config.detector.transform_fallback, TransformFallback::SkipFrame);
    assert_eq!(config.detector.lookahead_waypoints, 100);
    assert_eq!(config.map.lights.len(), 1);
    assert!((config.map.lights[0].z - 5.8).abs() < 1e-9, "light height defaults");
}

#[test]
fn load_from_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = NodeConfig::load_from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(..)));
}

#[test]
fn parse_error_reports_file_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[detector]\nstate_count_threshold = \"three\"").unwrap();

    let err = NodeConfig::load_from_file(file.path()).unwrap_err();
    match err {
        ConfigError::Parse(path, _) => assert_eq!(path, file.path()),
        other => panic!("expected parse error, got {other:?}"),
    }
}
