//! Projection Web Mercator (EPSG:3857)
//!
//! Aussi connu sous le nom de Pseudo-Mercator ou Spherical Mercator.
//! Utilisé par Google Maps, OpenStreetMap, etc.

use super::ellipsoid::WGS84;

/// Latitude maximale représentable sur le plan Web Mercator (degrés)
const MAX_LAT_DEG: f64 = 85.0;

/// Convertit WGS84 (degrés) vers Web Mercator (mètres)
pub fn wgs84_to_web_mercator(lon_deg: f64, lat_deg: f64) -> (f64, f64) {
    // Web Mercator utilise un modèle sphérique avec le rayon équatorial
    let r = WGS84::A;

    // Limiter la latitude pour éviter l'infini
    let lat = lat_deg
        .to_radians()
        .clamp(-MAX_LAT_DEG.to_radians(), MAX_LAT_DEG.to_radians());

    // X = R * longitude
    let x = r * lon_deg.to_radians();

    // Y = R * ln(tan(π/4 + lat/2))
    let y = r * (std::f64::consts::FRAC_PI_4 + lat / 2.0).tan().ln();

    (x, y)
}

/// Convertit Web Mercator (mètres) vers WGS84 (degrés)
pub fn web_mercator_to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let r = WGS84::A;

    // Longitude = x / R
    let lon = x / r;

    // Latitude = 2 * atan(exp(y/R)) - π/2
    let lat = 2.0 * (y / r).exp().atan() - std::f64::consts::FRAC_PI_2;

    (lon.to_degrees(), lat.to_degrees())
}
