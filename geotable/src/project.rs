//! Projection des géométries et colonnes dérivées
//!
//! Transforme une collection dans le CRS plan de référence et dérive pour
//! chaque enregistrement le type de géométrie et les coordonnées planes de
//! son centroïde.

use geo::{Centroid, Geometry};

use crate::error::GeotableError;
use crate::reproject::Reprojector;
use crate::types::{Collection, Crs, Value};

/// Colonne du tag de type de géométrie
pub const GEOMETRY_TYPE_COLUMN: &str = "geometry_type";

/// Colonne de l'abscisse plane du centroïde (mètres Web Mercator)
pub const X_COLUMN: &str = "x_meters";

/// Colonne de l'ordonnée plane du centroïde (mètres Web Mercator)
pub const Y_COLUMN: &str = "y_meters";

/// Reprojette la géométrie de toute la collection vers `target`.
///
/// Identité si la collection est déjà dans le CRS cible (reprojeter une
/// collection déjà dans la cible laisse la géométrie inchangée).
///
/// # Errors
///
/// `UndefinedCrs` si la collection n'a pas de CRS défini,
/// `UnsupportedReprojection` si la paire de CRS n'est pas couverte.
pub fn transform_crs(mut collection: Collection, target: Crs) -> Result<Collection, GeotableError> {
    let source = collection.crs.ok_or(GeotableError::UndefinedCrs)?;
    if source == target {
        return Ok(collection);
    }

    let reprojector = Reprojector::new(source, target)?;
    for record in &mut collection.records {
        if let Some(geometry) = &record.geometry {
            record.geometry = Some(reprojector.transform_geometry(geometry)?);
        }
    }
    collection.crs = Some(target);
    Ok(collection)
}

/// Ajoute (ou recalcule) `geometry_type`, `x_meters` et `y_meters`.
///
/// Les enregistrements sans géométrie exploitable reçoivent des valeurs
/// nulles mais sont conservés : les écarter est la décision du moteur de
/// conflation, pas du projecteur. Une coordonnée de centroïde infinie ou
/// NaN devient nulle, jamais propagée.
pub fn derive_columns(mut collection: Collection) -> Collection {
    for record in &mut collection.records {
        let (geometry_type, x, y) = match record.usable_geometry() {
            Some(geometry) => {
                let (x, y) = match geometry.centroid() {
                    Some(point) => (finite_or_null(point.x()), finite_or_null(point.y())),
                    None => (Value::Null, Value::Null),
                };
                (
                    Value::Text(geometry_type_name(geometry).to_string()),
                    x,
                    y,
                )
            }
            None => (Value::Null, Value::Null, Value::Null),
        };
        record.set(GEOMETRY_TYPE_COLUMN, geometry_type);
        record.set(X_COLUMN, x);
        record.set(Y_COLUMN, y);
    }

    for name in [GEOMETRY_TYPE_COLUMN, X_COLUMN, Y_COLUMN] {
        collection.add_column(name);
    }
    collection
}

/// Chemin complet côté acquisition : CRS plan de référence, puis colonnes
/// dérivées
pub fn project(collection: Collection) -> Result<Collection, GeotableError> {
    let collection = transform_crs(collection, Crs::WEB_MERCATOR)?;
    Ok(derive_columns(collection))
}

/// Tag de type d'une géométrie
pub fn geometry_type_name(geometry: &Geometry) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::Line(_) | Geometry::LineString(_) => "LineString",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::Polygon(_) | Geometry::Rect(_) | Geometry::Triangle(_) => "Polygon",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
    }
}

fn finite_or_null(value: f64) -> Value {
    if value.is_finite() {
        Value::Number(value)
    } else {
        Value::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Record;
    use geo::{LineString, Point, Polygon};

    fn single_point(crs: Option<Crs>, x: f64, y: f64) -> Collection {
        let mut collection = Collection::new();
        collection.crs = crs;
        collection.push(Record::with_geometry(Geometry::Point(Point::new(x, y))));
        collection
    }

    #[test]
    fn test_project_point_to_web_mercator() {
        // Paris: 2.35°E, 48.85°N
        let collection = single_point(Some(Crs::WGS84), 2.35, 48.85);
        let projected = project(collection).unwrap();

        assert_eq!(projected.crs, Some(Crs::WEB_MERCATOR));
        let record = &projected.records[0];
        match record.get(X_COLUMN) {
            Value::Number(x) => assert!((x - 261600.0).abs() < 1000.0, "x={}", x),
            other => panic!("Expected Number, got {:?}", other),
        }
        match record.get(Y_COLUMN) {
            Value::Number(y) => assert!((y - 6250000.0).abs() < 10000.0, "y={}", y),
            other => panic!("Expected Number, got {:?}", other),
        }
        assert_eq!(record.get(GEOMETRY_TYPE_COLUMN), &Value::Text("Point".into()));
    }

    #[test]
    fn test_transform_requires_crs() {
        let collection = single_point(None, 2.35, 48.85);
        assert!(matches!(
            transform_crs(collection, Crs::WEB_MERCATOR),
            Err(GeotableError::UndefinedCrs)
        ));
    }

    #[test]
    fn test_reprojection_is_idempotent() {
        let collection = single_point(Some(Crs::WEB_MERCATOR), 261600.0, 6250000.0);
        let transformed = transform_crs(collection, Crs::WEB_MERCATOR).unwrap();

        if let Some(Geometry::Point(p)) = &transformed.records[0].geometry {
            assert_eq!((p.x(), p.y()), (261600.0, 6250000.0));
        } else {
            panic!("Expected Point geometry");
        }
    }

    #[test]
    fn test_polygon_centroid() {
        let mut collection = Collection::new();
        collection.crs = Some(Crs::WEB_MERCATOR);
        collection.push(Record::with_geometry(Geometry::Polygon(Polygon::new(
            LineString::from(vec![
                (0.0, 0.0),
                (10.0, 0.0),
                (10.0, 10.0),
                (0.0, 10.0),
                (0.0, 0.0),
            ]),
            vec![],
        ))));

        let derived = derive_columns(collection);
        let record = &derived.records[0];
        assert_eq!(record.get(X_COLUMN), &Value::Number(5.0));
        assert_eq!(record.get(Y_COLUMN), &Value::Number(5.0));
        assert_eq!(
            record.get(GEOMETRY_TYPE_COLUMN),
            &Value::Text("Polygon".into())
        );
    }

    #[test]
    fn test_null_geometry_retained_with_null_columns() {
        let mut collection = Collection::new();
        collection.crs = Some(Crs::WEB_MERCATOR);
        collection.push(Record::new());

        let derived = derive_columns(collection);
        assert_eq!(derived.len(), 1);
        let record = &derived.records[0];
        assert!(record.get(GEOMETRY_TYPE_COLUMN).is_null());
        assert!(record.get(X_COLUMN).is_null());
        assert!(record.get(Y_COLUMN).is_null());
    }

    #[test]
    fn test_non_finite_centroid_becomes_null() {
        let mut collection = Collection::new();
        collection.crs = Some(Crs::WEB_MERCATOR);
        collection.push(Record::with_geometry(Geometry::Point(Point::new(
            f64::NAN,
            5.0,
        ))));

        let derived = derive_columns(collection);
        let record = &derived.records[0];
        assert!(record.get(X_COLUMN).is_null());
        assert_eq!(record.get(Y_COLUMN), &Value::Number(5.0));
    }

    #[test]
    fn test_derived_columns_added_to_schema() {
        let mut collection = Collection::with_columns(["id"]);
        collection.crs = Some(Crs::WEB_MERCATOR);
        let derived = derive_columns(collection);
        for column in [GEOMETRY_TYPE_COLUMN, X_COLUMN, Y_COLUMN] {
            assert!(derived.has_column(column));
        }
    }
}
