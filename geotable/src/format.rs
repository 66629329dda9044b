//! Mise en forme pour l'export
//!
//! Ordre de colonnes fixe et remplacement des valeurs nulles pour l'export
//! tabulaire à plat. Pur remodelage, aucun calcul.

use crate::types::{Collection, Value};

/// Colonnes placées en tête de l'export, dans cet ordre ; les colonnes
/// restantes suivent dans leur ordre relatif existant
const LEADING_COLUMNS: &[&str] = &[
    "id",
    "name",
    "addr:street",
    "addr:housenumber",
    "x_meters",
    "y_meters",
];

/// Réordonne les colonnes selon la priorité fixe d'export
pub fn order_columns(mut collection: Collection) -> Collection {
    let mut ordered: Vec<String> = LEADING_COLUMNS
        .iter()
        .filter(|c| collection.has_column(c))
        .map(|c| c.to_string())
        .collect();

    for column in &collection.columns {
        if !ordered.contains(column) {
            ordered.push(column.clone());
        }
    }

    collection.columns = ordered;
    collection
}

/// Remplace chaque valeur nulle par une chaîne vide.
///
/// Réservé au chemin d'export tabulaire à plat : le chemin d'export
/// géométrique conserve les valeurs nulles telles quelles.
pub fn fill_nulls(mut collection: Collection) -> Collection {
    let columns = collection.columns.clone();
    for record in &mut collection.records {
        for column in &columns {
            if record.get(column).is_null() {
                record.set(column.clone(), Value::Text(String::new()));
            }
        }
    }
    collection
}
