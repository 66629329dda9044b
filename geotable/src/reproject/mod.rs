//! Reprojection entre systèmes de coordonnées
//!
//! Le chemin principal du pipeline (WGS84 ↔ Web Mercator) est en Rust pur,
//! sans dépendance externe. Toute autre paire EPSG passe par la bibliothèque
//! PROJ, derrière la feature `reproject`.

mod ellipsoid;
mod mercator;
#[cfg(feature = "reproject")]
mod proj_backend;

pub use ellipsoid::WGS84;

use geo::{Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};

use crate::error::GeotableError;
use crate::types::Crs;

/// Reprojette des géométries entre deux CRS, par la meilleure voie disponible
pub enum Reprojector {
    /// Source == cible
    Identity,
    /// WGS84 ↔ Web Mercator en Rust pur
    Lite { source: Crs, target: Crs },
    /// PROJ, pour toute autre paire (feature `reproject`)
    #[cfg(feature = "reproject")]
    Proj(proj_backend::ProjReprojector),
}

impl Reprojector {
    /// Crée un reprojector entre deux CRS
    pub fn new(source: Crs, target: Crs) -> Result<Self, GeotableError> {
        if source == target {
            return Ok(Self::Identity);
        }

        if is_lite_pair(source, target) {
            return Ok(Self::Lite { source, target });
        }

        #[cfg(feature = "reproject")]
        {
            let backend = proj_backend::ProjReprojector::new(source, target)?;
            return Ok(Self::Proj(backend));
        }

        #[cfg(not(feature = "reproject"))]
        return Err(GeotableError::UnsupportedReprojection {
            src: source.epsg,
            target: target.epsg,
        });
    }

    /// Transforme un point (x, y) de la source vers la cible
    pub fn transform_point(&self, x: f64, y: f64) -> Result<(f64, f64), GeotableError> {
        match self {
            Self::Identity => Ok((x, y)),
            Self::Lite { source, target } => match (source.epsg, target.epsg) {
                (4326, 3857) => Ok(mercator::wgs84_to_web_mercator(x, y)),
                (3857, 4326) => Ok(mercator::web_mercator_to_wgs84(x, y)),
                _ => Err(GeotableError::UnsupportedReprojection {
                    src: source.epsg,
                    target: target.epsg,
                }),
            },
            #[cfg(feature = "reproject")]
            Self::Proj(backend) => backend.transform(x, y),
        }
    }

    /// Transforme une géométrie
    pub fn transform_geometry(&self, geom: &Geometry) -> Result<Geometry, GeotableError> {
        if matches!(self, Self::Identity) {
            return Ok(geom.clone());
        }

        match geom {
            Geometry::Point(p) => {
                let (x, y) = self.transform_point(p.x(), p.y())?;
                Ok(Geometry::Point(Point::new(x, y)))
            }
            Geometry::LineString(ls) => Ok(Geometry::LineString(self.transform_linestring(ls)?)),
            Geometry::Polygon(poly) => Ok(Geometry::Polygon(self.transform_polygon(poly)?)),
            Geometry::MultiPoint(mp) => {
                let points: Result<Vec<Point>, _> = mp
                    .iter()
                    .map(|p| {
                        let (x, y) = self.transform_point(p.x(), p.y())?;
                        Ok(Point::new(x, y))
                    })
                    .collect();
                Ok(Geometry::MultiPoint(MultiPoint::new(points?)))
            }
            Geometry::MultiLineString(mls) => {
                let lines: Result<Vec<LineString>, _> = mls
                    .iter()
                    .map(|ls| self.transform_linestring(ls))
                    .collect();
                Ok(Geometry::MultiLineString(MultiLineString::new(lines?)))
            }
            Geometry::MultiPolygon(mp) => {
                let polys: Result<Vec<Polygon>, _> =
                    mp.iter().map(|p| self.transform_polygon(p)).collect();
                Ok(Geometry::MultiPolygon(MultiPolygon::new(polys?)))
            }
            Geometry::Line(_) => Err(GeotableError::UnsupportedGeometry("Line")),
            Geometry::Rect(_) => Err(GeotableError::UnsupportedGeometry("Rect")),
            Geometry::Triangle(_) => Err(GeotableError::UnsupportedGeometry("Triangle")),
            Geometry::GeometryCollection(_) => {
                Err(GeotableError::UnsupportedGeometry("GeometryCollection"))
            }
        }
    }

    fn transform_linestring(&self, ls: &LineString) -> Result<LineString, GeotableError> {
        let coords: Result<Vec<Coord>, GeotableError> = ls
            .coords()
            .map(|c| {
                let (x, y) = self.transform_point(c.x, c.y)?;
                Ok(Coord { x, y })
            })
            .collect();
        Ok(LineString::new(coords?))
    }

    fn transform_polygon(&self, poly: &Polygon) -> Result<Polygon, GeotableError> {
        let exterior = self.transform_linestring(poly.exterior())?;
        let interiors: Result<Vec<LineString>, GeotableError> = poly
            .interiors()
            .iter()
            .map(|ring| self.transform_linestring(ring))
            .collect();
        Ok(Polygon::new(exterior, interiors?))
    }
}

/// Paires couvertes par le chemin Rust pur
fn is_lite_pair(source: Crs, target: Crs) -> bool {
    matches!((source.epsg, target.epsg), (4326, 3857) | (3857, 4326))
}
