//! Moteur de conflation
//!
//! Jointure externe de deux collections normalisées sur l'identifiant
//! canonique, réconciliation des colonnes partagées et de la géométrie,
//! puis recalcul des colonnes dérivées sur la géométrie finale.
//!
//! Règle de précédence fixe du moteur, non configurable : la collection
//! primaire (la source faisant autorité) gagne dès que sa valeur est non
//! nulle, la secondaire comble les trous.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::GeotableError;
use crate::project;
use crate::schema::ID_COLUMN;
use crate::types::{Collection, Crs, Record, Value};

/// Compteurs de la jointure, pour le résumé de fin d'exécution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Identifiants présents des deux côtés
    pub matched: usize,

    /// Identifiants présents uniquement côté primaire
    pub primary_only: usize,

    /// Identifiants présents uniquement côté secondaire
    pub secondary_only: usize,

    /// Enregistrements écartés faute de géométrie exploitable
    pub dropped_no_geometry: usize,
}

impl MergeReport {
    /// Nombre total d'identifiants joints (avant écartement)
    pub fn total(&self) -> usize {
        self.matched + self.primary_only + self.secondary_only
    }
}

/// Résultat de la conflation
#[derive(Debug)]
pub struct MergeOutcome {
    /// Collection fusionnée, dans le CRS plan de référence
    pub collection: Collection,

    /// Compteurs de la jointure
    pub report: MergeReport,
}

/// Conflation de deux collections normalisées.
///
/// Produit une collection contenant l'union des identifiants des deux
/// entrées (jointure externe), la valeur primaire primant sur la secondaire
/// pour chaque colonne partagée et pour la géométrie. La collection
/// résultante est reprojetée dans le CRS plan de référence, les
/// enregistrements sans géométrie réconciliée sont écartés, et les colonnes
/// dérivées (type, centroïde) sont recalculées sur la géométrie finale.
///
/// # Errors
///
/// `MissingIdentifier` si l'une des entrées n'a pas de colonne `id` (elle
/// n'a pas été normalisée) : jamais de jointure positionnelle de repli.
pub fn conflate(
    primary: Collection,
    secondary: Collection,
) -> Result<MergeOutcome, GeotableError> {
    require_id(&primary, "primary")?;
    require_id(&secondary, "secondary")?;

    // Décision CRS : en cas de désaccord, la secondaire est ramenée dans le
    // CRS de la primaire avant la jointure
    let secondary = align_crs(&primary, secondary)?;

    let shared = shared_columns(&primary, &secondary);
    debug!(
        shared = shared.len(),
        primary = primary.len(),
        secondary = secondary.len(),
        "conflating collections"
    );

    let mut merged = Collection::new();
    merged.columns = output_columns(&primary, &secondary);
    merged.crs = primary.crs.or(secondary.crs);
    let columns = merged.columns.clone();

    // Index de la secondaire par identifiant
    let mut secondary_index: HashMap<&str, usize> =
        HashMap::with_capacity(secondary.records.len());
    for (i, record) in secondary.records.iter().enumerate() {
        if let Some(id) = record.get(ID_COLUMN).as_text() {
            secondary_index.entry(id).or_insert(i);
        }
    }

    let mut report = MergeReport::default();
    let mut consumed = vec![false; secondary.records.len()];

    for record in &primary.records {
        let counterpart = record
            .get(ID_COLUMN)
            .as_text()
            .and_then(|id| secondary_index.get(id).copied())
            .map(|i| {
                consumed[i] = true;
                &secondary.records[i]
            });

        match counterpart {
            Some(_) => report.matched += 1,
            None => report.primary_only += 1,
        }
        merged.push(reconcile(&columns, Some(record), counterpart));
    }

    for (i, record) in secondary.records.iter().enumerate() {
        if consumed[i] {
            continue;
        }
        report.secondary_only += 1;
        merged.push(reconcile(&columns, None, Some(record)));
    }

    // CRS plan de référence pour les calculs métriques. Deux entrées vides
    // donnent une collection vide sans CRS : rien à projeter
    if merged.crs.is_some() || !merged.is_empty() {
        merged = project::transform_crs(merged, Crs::WEB_MERCATOR)?;
    }

    // Un identifiant fusionné sans géométrie d'aucun côté n'a pas de valeur
    // spatiale : écarté
    let before = merged.len();
    merged.records.retain(Record::has_geometry);
    report.dropped_no_geometry = before - merged.len();

    // Les colonnes dérivées héritées de la jointure décrivent la géométrie
    // d'avant fusion : recalculées sur la géométrie réconciliée
    let merged = project::derive_columns(merged);

    Ok(MergeOutcome {
        collection: merged,
        report,
    })
}

fn require_id(collection: &Collection, side: &str) -> Result<(), GeotableError> {
    if collection.has_column(ID_COLUMN) {
        Ok(())
    } else {
        Err(GeotableError::missing_identifier(
            side,
            "no 'id' column; normalize the collection before conflation",
        ))
    }
}

/// Ramène la secondaire dans le CRS de la primaire quand les deux sont
/// définis et diffèrent. Jamais une erreur : un désaccord de CRS entre
/// sources est attendu, l'alignement est explicite et journalisé.
fn align_crs(primary: &Collection, secondary: Collection) -> Result<Collection, GeotableError> {
    match (primary.crs, secondary.crs) {
        (Some(p), Some(s)) if p != s => {
            warn!(primary = %p, secondary = %s, "CRS mismatch, reprojecting secondary into primary CRS");
            project::transform_crs(secondary, p)
        }
        _ => Ok(secondary),
    }
}

/// Colonnes partagées par les deux entrées (hors identifiant) : celles dont
/// les deux variantes sont réconciliées par précédence
fn shared_columns(primary: &Collection, secondary: &Collection) -> Vec<String> {
    primary
        .columns
        .iter()
        .filter(|c| c.as_str() != ID_COLUMN && secondary.has_column(c))
        .cloned()
        .collect()
}

/// Ordre des colonnes de sortie : celles de la primaire, puis celles
/// propres à la secondaire dans leur ordre relatif
fn output_columns(primary: &Collection, secondary: &Collection) -> Vec<String> {
    let mut columns = primary.columns.clone();
    for column in &secondary.columns {
        if !columns.contains(column) {
            columns.push(column.clone());
        }
    }
    columns
}

/// Réconciliation pure de deux enregistrements appariés sur l'ensemble des
/// colonnes de sortie : pour chaque colonne, la valeur primaire si non
/// nulle, sinon la secondaire. Même précédence pour la géométrie, une
/// géométrie vide comptant comme absente. Un côté manquant se lit comme
/// entièrement nul.
fn reconcile(columns: &[String], primary: Option<&Record>, secondary: Option<&Record>) -> Record {
    let mut merged = Record::new();
    for column in columns {
        let first = primary.map_or(&Value::Null, |r| r.get(column));
        let value = if first.is_null() {
            secondary.map_or(&Value::Null, |r| r.get(column))
        } else {
            first
        };
        if !value.is_null() {
            merged.set(column.clone(), value.clone());
        }
    }

    merged.geometry = primary
        .and_then(|r| r.usable_geometry().cloned())
        .or_else(|| secondary.and_then(|r| r.usable_geometry().cloned()));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{X_COLUMN, Y_COLUMN};
    use geo::{Geometry, LineString, Point, Polygon};

    fn normalized(columns: &[&str], crs: Crs) -> Collection {
        let mut collection = Collection::with_columns(columns.iter().copied());
        collection.crs = Some(crs);
        collection
    }

    fn record(id: &str, geometry: Option<Geometry>) -> Record {
        let mut record = Record::new();
        record.set(ID_COLUMN, Value::Text(id.to_string()));
        record.geometry = geometry;
        record
    }

    #[test]
    fn test_precedence_primary_wins() {
        let mut primary = normalized(&["id", "name"], Crs::WEB_MERCATOR);
        let mut r = record("1", Some(Geometry::Point(Point::new(10.0, 20.0))));
        r.set("name", Value::Text("x".into()));
        primary.push(r);

        let mut secondary = normalized(&["id", "name"], Crs::WEB_MERCATOR);
        let mut r = record("1", None);
        r.set("name", Value::Text("y".into()));
        secondary.push(r);

        let outcome = conflate(primary, secondary).unwrap();
        assert_eq!(
            outcome.collection.records[0].get("name"),
            &Value::Text("x".into())
        );
        assert_eq!(outcome.report.matched, 1);
    }

    #[test]
    fn test_precedence_falls_back_on_null() {
        let mut primary = normalized(&["id", "name"], Crs::WEB_MERCATOR);
        primary.push(record("1", Some(Geometry::Point(Point::new(10.0, 20.0)))));

        let mut secondary = normalized(&["id", "name"], Crs::WEB_MERCATOR);
        let mut r = record("1", None);
        r.set("name", Value::Text("y".into()));
        secondary.push(r);

        let outcome = conflate(primary, secondary).unwrap();
        assert_eq!(
            outcome.collection.records[0].get("name"),
            &Value::Text("y".into())
        );
    }

    #[test]
    fn test_outer_join_completeness() {
        let mut primary = normalized(&["id"], Crs::WEB_MERCATOR);
        primary.push(record("1", Some(Geometry::Point(Point::new(0.0, 0.0)))));
        primary.push(record("2", Some(Geometry::Point(Point::new(1.0, 1.0)))));

        let mut secondary = normalized(&["id"], Crs::WEB_MERCATOR);
        secondary.push(record("2", Some(Geometry::Point(Point::new(5.0, 5.0)))));
        secondary.push(record("3", Some(Geometry::Point(Point::new(2.0, 2.0)))));

        let outcome = conflate(primary, secondary).unwrap();
        let ids: Vec<&str> = outcome
            .collection
            .records
            .iter()
            .map(|r| r.get(ID_COLUMN).as_text().unwrap())
            .collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(outcome.report.matched, 1);
        assert_eq!(outcome.report.primary_only, 1);
        assert_eq!(outcome.report.secondary_only, 1);

        // La géométrie de "2" vient de la primaire
        if let Some(Geometry::Point(p)) = &outcome.collection.records[1].geometry {
            assert_eq!((p.x(), p.y()), (1.0, 1.0));
        } else {
            panic!("Expected Point geometry");
        }
    }

    #[test]
    fn test_scenario_clinic() {
        // A = [{id:"1", name:"Clinic", geometry: Point(10,20)}]
        // B = [{id:"1", name:null, addr:street:"Main St"}]
        let mut primary = normalized(&["id", "name"], Crs::WEB_MERCATOR);
        let mut r = record("1", Some(Geometry::Point(Point::new(10.0, 20.0))));
        r.set("name", Value::Text("Clinic".into()));
        primary.push(r);

        let mut secondary = normalized(&["id", "name", "addr:street"], Crs::WEB_MERCATOR);
        let mut r = record("1", None);
        r.set("addr:street", Value::Text("Main St".into()));
        secondary.push(r);

        let outcome = conflate(primary, secondary).unwrap();
        assert_eq!(outcome.collection.len(), 1);
        let merged = &outcome.collection.records[0];
        assert_eq!(merged.get("name"), &Value::Text("Clinic".into()));
        assert_eq!(merged.get("addr:street"), &Value::Text("Main St".into()));
        assert_eq!(merged.get(X_COLUMN), &Value::Number(10.0));
        assert_eq!(merged.get(Y_COLUMN), &Value::Number(20.0));
        if let Some(Geometry::Point(p)) = &merged.geometry {
            assert_eq!((p.x(), p.y()), (10.0, 20.0));
        } else {
            panic!("Expected Point geometry");
        }
    }

    #[test]
    fn test_scenario_secondary_only() {
        // A = [], B = [{id:"2", geometry: Polygon}]
        let primary = normalized(&["id"], Crs::WEB_MERCATOR);

        let mut secondary = normalized(&["id"], Crs::WEB_MERCATOR);
        secondary.push(record(
            "2",
            Some(Geometry::Polygon(Polygon::new(
                LineString::from(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 0.0)]),
                vec![],
            ))),
        ));

        let outcome = conflate(primary, secondary).unwrap();
        assert_eq!(outcome.collection.len(), 1);
        assert_eq!(
            outcome.collection.records[0].get(ID_COLUMN),
            &Value::Text("2".into())
        );
        assert_eq!(outcome.report.secondary_only, 1);
    }

    #[test]
    fn test_scenario_null_geometry_dropped() {
        // A = [{id:"3", geometry: null}], B = []
        let mut primary = normalized(&["id"], Crs::WEB_MERCATOR);
        primary.push(record("3", None));
        let secondary = normalized(&["id"], Crs::WEB_MERCATOR);

        let outcome = conflate(primary, secondary).unwrap();
        assert!(outcome.collection.is_empty());
        assert_eq!(outcome.report.dropped_no_geometry, 1);
    }

    #[test]
    fn test_geometry_falls_back_to_secondary() {
        let mut primary = normalized(&["id"], Crs::WEB_MERCATOR);
        primary.push(record("1", None));

        let mut secondary = normalized(&["id"], Crs::WEB_MERCATOR);
        secondary.push(record("1", Some(Geometry::Point(Point::new(7.0, 8.0)))));

        let outcome = conflate(primary, secondary).unwrap();
        assert_eq!(outcome.collection.len(), 1);
        if let Some(Geometry::Point(p)) = &outcome.collection.records[0].geometry {
            assert_eq!((p.x(), p.y()), (7.0, 8.0));
        } else {
            panic!("Expected Point geometry");
        }
    }

    #[test]
    fn test_empty_geometry_counts_as_absent() {
        let mut primary = normalized(&["id"], Crs::WEB_MERCATOR);
        primary.push(record(
            "1",
            Some(Geometry::LineString(LineString::new(vec![]))),
        ));

        let mut secondary = normalized(&["id"], Crs::WEB_MERCATOR);
        secondary.push(record("1", Some(Geometry::Point(Point::new(3.0, 4.0)))));

        let outcome = conflate(primary, secondary).unwrap();
        if let Some(Geometry::Point(p)) = &outcome.collection.records[0].geometry {
            assert_eq!((p.x(), p.y()), (3.0, 4.0));
        } else {
            panic!("Expected Point geometry from secondary");
        }
    }

    #[test]
    fn test_both_empty_inputs_yield_empty_collection() {
        let primary = Collection::with_columns(["id", "name"]);
        let secondary = Collection::with_columns(["id", "shop"]);

        let outcome = conflate(primary, secondary).unwrap();
        assert!(outcome.collection.is_empty());
        assert_eq!(outcome.report.total(), 0);
        // Schéma toujours valide
        for column in ["id", "name", "shop"] {
            assert!(outcome.collection.has_column(column));
        }
    }

    #[test]
    fn test_missing_id_fails_fast() {
        let primary = Collection::with_columns(["name"]);
        let secondary = Collection::with_columns(["id"]);
        assert!(matches!(
            conflate(primary, secondary),
            Err(GeotableError::MissingIdentifier { .. })
        ));
    }

    #[test]
    fn test_crs_mismatch_reprojects_secondary() {
        // Primaire déjà en Web Mercator, secondaire en WGS84 : la
        // secondaire est reprojetée avant la jointure
        let mut primary = normalized(&["id"], Crs::WEB_MERCATOR);
        primary.push(record("1", Some(Geometry::Point(Point::new(0.0, 0.0)))));

        let mut secondary = normalized(&["id"], Crs::WGS84);
        secondary.push(record("2", Some(Geometry::Point(Point::new(2.35, 48.85)))));

        let outcome = conflate(primary, secondary).unwrap();
        assert_eq!(outcome.collection.crs, Some(Crs::WEB_MERCATOR));
        let paris = outcome
            .collection
            .records
            .iter()
            .find(|r| r.get(ID_COLUMN).as_text() == Some("2"))
            .unwrap();
        if let Some(Geometry::Point(p)) = &paris.geometry {
            assert!((p.x() - 261600.0).abs() < 1000.0, "x={}", p.x());
        } else {
            panic!("Expected Point geometry");
        }
    }

    #[test]
    fn test_merged_collection_reprojected_to_planar() {
        // Les deux entrées en WGS84 : la fusion ressort en Web Mercator
        let mut primary = normalized(&["id"], Crs::WGS84);
        primary.push(record("1", Some(Geometry::Point(Point::new(2.35, 48.85)))));
        let secondary = normalized(&["id"], Crs::WGS84);

        let outcome = conflate(primary, secondary).unwrap();
        assert_eq!(outcome.collection.crs, Some(Crs::WEB_MERCATOR));
        match outcome.collection.records[0].get(X_COLUMN) {
            Value::Number(x) => assert!((x - 261600.0).abs() < 1000.0, "x={}", x),
            other => panic!("Expected Number, got {:?}", other),
        }
    }

    #[test]
    fn test_stale_derived_columns_are_recomputed() {
        // La secondaire porte des centroïdes d'avant fusion : la géométrie
        // finale venant de la primaire, ils sont recalculés
        let mut primary = normalized(&["id"], Crs::WEB_MERCATOR);
        primary.push(record("1", Some(Geometry::Point(Point::new(100.0, 200.0)))));

        let mut secondary = normalized(&["id", "x_meters", "y_meters"], Crs::WEB_MERCATOR);
        let mut r = record("1", Some(Geometry::Point(Point::new(999.0, 999.0))));
        r.set("x_meters", Value::Number(999.0));
        r.set("y_meters", Value::Number(999.0));
        secondary.push(r);

        let outcome = conflate(primary, secondary).unwrap();
        let merged = &outcome.collection.records[0];
        assert_eq!(merged.get(X_COLUMN), &Value::Number(100.0));
        assert_eq!(merged.get(Y_COLUMN), &Value::Number(200.0));
    }
}
