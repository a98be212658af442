//! Config validation: unknown-key detection with Levenshtein suggestions
//! and value range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " — did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for NodeConfig.
///
/// Maintained manually to match the struct hierarchy in node_config.rs.
/// Array-of-table entries (`[[map.lights]]`) share one path per field.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [node]
        "node",
        "node.name",
        // [detector]
        "detector",
        "detector.state_count_threshold",
        "detector.lookahead_waypoints",
        "detector.transform_fallback",
        "detector.missing_input_log_interval",
        // [classifier]
        "classifier",
        "classifier.kind",
        "classifier.warmup_secs",
        "classifier.min_pixel_fraction",
        "classifier.min_value",
        // [camera]
        "camera",
        "camera.focal_length_x",
        "camera.focal_length_y",
        "camera.image_width",
        "camera.image_height",
        "camera.mounting_height_m",
        "camera.crop_width",
        "camera.crop_height",
        // [route]
        "route",
        "route.closed_loop",
        // [[map.lights]]
        "map",
        "map.lights",
        "map.lights.x",
        "map.lights.y",
        "map.lights.z",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields
/// `["a", "a.b", "a.c"]`. Tables inside arrays contribute their keys under
/// the array's path, once per distinct key.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            match v {
                toml::Value::Table(_) => keys.extend(walk_toml_keys(v, &path)),
                toml::Value::Array(items) => {
                    for item in items.iter().filter(|i| i.is_table()) {
                        for nested in walk_toml_keys(item, &path) {
                            if !keys.contains(&nested) {
                                keys.push(nested);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
///
/// Ties resolve to the lexicographically smaller key so suggestions are stable.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (k, levenshtein(unknown, k)))
        .filter(|&(_, dist)| dist <= 3)
        .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)))
        .map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys; it only warns. Existing configs
/// always continue to work.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| {
            let suggestion = suggest_correction(&key, &known);
            let message = format!("Unknown config key '{key}'");
            ValidationWarning {
                field: key,
                message,
                suggestion,
            }
        })
        .collect()
}

// ============================================================================
// Range Validation
// ============================================================================

/// Validate numeric ranges on a parsed NodeConfig.
///
/// Returns errors for impossible values that must prevent startup.
pub fn validate_ranges(config: &super::NodeConfig) -> Vec<String> {
    let mut errors = Vec::new();

    let c = &config.camera;
    for (name, value) in [
        ("camera.focal_length_x", c.focal_length_x),
        ("camera.focal_length_y", c.focal_length_y),
    ] {
        if !value.is_finite() || value <= 0.0 {
            errors.push(format!("{name} = {value} must be a positive finite number"));
        }
    }
    if !c.mounting_height_m.is_finite() {
        errors.push(format!(
            "camera.mounting_height_m = {} must be finite",
            c.mounting_height_m
        ));
    }

    let cl = &config.classifier;
    if !cl.warmup_secs.is_finite() || cl.warmup_secs < 0.0 {
        errors.push(format!(
            "classifier.warmup_secs = {} must be a finite number >= 0",
            cl.warmup_secs
        ));
    }
    if !(0.0..=1.0).contains(&cl.min_pixel_fraction) {
        errors.push(format!(
            "classifier.min_pixel_fraction = {} is outside range (0-1)",
            cl.min_pixel_fraction
        ));
    }
    if !(0.0..=255.0).contains(&cl.min_value) {
        errors.push(format!(
            "classifier.min_value = {} is outside range (0-255)",
            cl.min_value
        ));
    }

    for (i, light) in config.map.lights.iter().enumerate() {
        if !(light.x.is_finite() && light.y.is_finite() && light.z.is_finite()) {
            errors.push(format!(
                "map.lights[{i}] has a non-finite coordinate ({}, {}, {})",
                light.x, light.y, light.z
            ));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn walks_array_of_tables() {
        let value: toml::Value = "[[map.lights]]\nx = 1.0\ny = 2.0\n[[map.lights]]\nx = 3.0\ny = 4.0\n"
            .parse()
            .unwrap();
        let keys = walk_toml_keys(&value, "");
        assert_eq!(keys, vec!["map", "map.lights", "map.lights.x", "map.lights.y"]);
    }
}
