//! Reconciles backend-reported scores into one similarity in `[0, 1]`.
//!
//! The text and image backends report confidence on different scales. A
//! value inside `[0, 1]` is taken as a similarity; anything above `1.0` is
//! taken as a distance and mapped through `1 / (1 + d)`.

/// Map a raw backend score to a similarity in `[0.0, 1.0]`.
///
/// | Input | Output |
/// |-------|--------|
/// | `None`, `NaN`, negative | `0.0` |
/// | `0.0..=1.0` | unchanged |
/// | `> 1.0` (distance) | `1 / (1 + d)` |
///
/// ```rust
/// use shopping_assistant_core::score::normalize_score;
///
/// assert_eq!(normalize_score(Some(0.95)), 0.95);
/// assert_eq!(normalize_score(Some(3.0)), 0.25);
/// assert_eq!(normalize_score(None), 0.0);
/// ```
pub fn normalize_score(raw: Option<f64>) -> f64 {
    match raw {
        None => 0.0,
        Some(s) if s.is_nan() || s < 0.0 => 0.0,
        Some(s) if s <= 1.0 => s,
        Some(d) => distance_to_similarity(d),
    }
}

/// Monotonically decreasing map from `[0, ∞)` to `(0, 1]`; `0` maps to `1`.
pub fn distance_to_similarity(distance: f64) -> f64 {
    if distance.is_nan() || distance < 0.0 {
        return 0.0;
    }
    if distance.is_infinite() {
        return 0.0;
    }
    1.0 / (1.0 + distance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documented_points() {
        assert_eq!(normalize_score(Some(0.95)), 0.95);
        assert_eq!(normalize_score(Some(-1.0)), 0.0);
        assert!((normalize_score(Some(3.0)) - 0.25).abs() < 1e-12);
        assert_eq!(normalize_score(None), 0.0);
    }

    #[test]
    fn bounds_are_similarities() {
        assert_eq!(normalize_score(Some(0.0)), 0.0);
        assert_eq!(normalize_score(Some(1.0)), 1.0);
    }

    #[test]
    fn zero_distance_is_exact_match() {
        assert_eq!(distance_to_similarity(0.0), 1.0);
    }

    #[test]
    fn distance_map_is_decreasing() {
        let mut prev = normalize_score(Some(1.0001));
        for d in [1.5, 2.0, 10.0, 1e3, 1e9] {
            let s = normalize_score(Some(d));
            assert!(s < prev, "{} should map below {}", d, prev);
            prev = s;
        }
    }

    #[test]
    fn always_in_unit_interval() {
        let inputs = [
            None,
            Some(f64::NAN),
            Some(f64::INFINITY),
            Some(f64::NEG_INFINITY),
            Some(-0.0),
            Some(-1e9),
            Some(0.5),
            Some(1.0 + f64::EPSILON),
            Some(1e300),
        ];
        for raw in inputs {
            let s = normalize_score(raw);
            assert!((0.0..=1.0).contains(&s), "{:?} -> {}", raw, s);
        }
    }
}
