//! 위치 계산 유틸리티.
//!
//! - [`haversine_m`]: 두 좌표 간 대권 거리 (미터)
//! - [`project_planar`]: 방위각 방향으로 짧은 거리를 평면 근사로 투영
//! - [`normalize_heading`]: 방위각을 `[0, 360)` 범위로 정규화

/// 지구 평균 반지름 (미터).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// 위도 1도당 거리 (미터, 평면 근사용).
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// 방위각을 `[0, 360)` 범위로 정규화.
///
/// `rem_euclid`는 아주 작은 음수에 대해 반올림으로 360.0을 돌려줄 수 있으므로
/// 그 경우 0.0으로 접는다.
pub fn normalize_heading(heading: f64) -> f64 {
    if !heading.is_finite() {
        return 0.0;
    }
    let normalized = heading.rem_euclid(360.0);
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}

/// 두 좌표 간 haversine 거리 (미터).
pub fn haversine_m(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// 방위각(`heading_deg`, 북쪽 0도 시계 방향) 방향으로 `distance_m`만큼 이동한 좌표.
///
/// 짧은 거리 전용 평면(equirectangular) 근사. 측지선 계산이 아니다.
pub fn project_planar(lat: f64, lng: f64, heading_deg: f64, distance_m: f64) -> (f64, f64) {
    let heading = heading_deg.to_radians();
    let d_lat = distance_m * heading.cos() / METERS_PER_DEGREE;

    // 극 근처에서 경도 스케일이 0으로 가는 것 방지
    let lng_scale = (METERS_PER_DEGREE * lat.to_radians().cos()).max(1e-6);
    let d_lng = distance_m * heading.sin() / lng_scale;

    (lat + d_lat, lng + d_lng)
}
