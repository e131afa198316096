//! Spatial math for distance and interpolation.

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters between two lat/lng points (degrees).
pub fn haversine_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lng2 - lng1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    // Rounding can push `a` just past 1 near antipodes.
    let a = a.clamp(0.0, 1.0);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Meters travelled in one tick at `speed_kmh`.
pub fn travel_per_tick_m(speed_kmh: f64, tick_secs: f64) -> f64 {
    speed_kmh / 3.6 * tick_secs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // ~111km between these points (1 degree latitude)
        let dist = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((dist - 111_194.0).abs() < 100.0);
    }

    #[test]
    fn test_haversine_same_point() {
        let dist = haversine_distance(55.7558, 37.6173, 55.7558, 37.6173);
        assert_eq!(dist, 0.0);
    }

    #[test]
    fn haversine_is_symmetric() {
        let points = [
            (55.7558, 37.6173),
            (55.7568, 37.6183),
            (-33.8688, 151.2093),
            (40.7128, -74.0060),
            (0.0, 179.9),
            (0.0, -179.9),
        ];
        for &(lat1, lng1) in &points {
            for &(lat2, lng2) in &points {
                let ab = haversine_distance(lat1, lng1, lat2, lng2);
                let ba = haversine_distance(lat2, lng2, lat1, lng1);
                assert!((ab - ba).abs() < 1e-6, "asymmetric: {ab} vs {ba}");
            }
        }
    }

    #[test]
    fn short_hop_in_moscow_is_about_130_meters() {
        let dist = haversine_distance(55.7558, 37.6173, 55.7568, 37.6183);
        assert!((dist - 128.0).abs() < 5.0, "got {dist}");
    }

    #[test]
    fn near_antipodal_points_stay_finite() {
        let half_circumference = std::f64::consts::PI * EARTH_RADIUS_M;
        for step in 0..9_000 {
            let lat = f64::from(step) * 0.01;
            let dist = haversine_distance(lat, 0.0, -lat, 180.0);
            assert!(dist.is_finite(), "NaN at lat {lat}");
            assert!(dist <= half_circumference + 1e-6);
        }
        let dist = haversine_distance(0.015, 0.0, -0.015, 180.0);
        assert!((dist - half_circumference).abs() < 1.0, "got {dist}");
    }

    #[test]
    fn travel_per_tick_converts_kmh() {
        assert!((travel_per_tick_m(36.0, 1.0) - 10.0).abs() < 1e-9);
        assert!((travel_per_tick_m(36.0, 0.5) - 5.0).abs() < 1e-9);
    }
}
