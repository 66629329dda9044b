//! Normalisation de schéma
//!
//! Rend une collection brute canonique : index aplati, colonnes en
//! minuscules, identifiant unique `id` typé chaîne, colonnes attendues
//! garanties, CRS par défaut. Transformation pure : même entrée, même
//! sortie, quelle que soit la provenance de la collection.

use std::collections::HashMap;

use tracing::debug;

use crate::error::GeotableError;
use crate::types::{Collection, Crs, Value};

/// Nom de la colonne identifiant canonique
pub const ID_COLUMN: &str = "id";

/// Colonnes candidates pour l'identifiant, par ordre de priorité.
/// La première présente gagne ; la casse est ignorée (les colonnes sont
/// passées en minuscules avant la recherche).
const ID_CANDIDATES: &[&str] = &["osmid", "@id", "id", "osm_id"];

/// Colonnes d'attributs garanties présentes après normalisation, pour que
/// les sélections de colonnes en aval ne puissent jamais échouer
const EXPECTED_COLUMNS: &[&str] = &[
    "name",
    "addr:street",
    "addr:housenumber",
    "amenity",
    "building",
    "leisure",
    "healthcare",
    "office",
    "emergency",
    "shop",
];

/// Normalise une collection brute.
///
/// # Arguments
///
/// * `collection` - Collection aux colonnes imprévisibles, CRS possiblement absent
/// * `label` - Nom de la source, pour les messages d'erreur
///
/// # Errors
///
/// `MissingIdentifier` si aucune colonne candidate n'est présente, ou si un
/// enregistrement porte une valeur d'identifiant nulle. Pas de repli
/// silencieux : l'appelant doit abandonner le pipeline pour cette collection.
pub fn normalize(collection: Collection, label: &str) -> Result<Collection, GeotableError> {
    let mut collection = flatten_index(collection);
    lowercase_columns(&mut collection);
    derive_id(&mut collection, label)?;
    ensure_expected_columns(&mut collection);

    // Repli documenté : un CRS absent est supposé géographique
    if collection.crs.is_none() {
        debug!(label, crs = %Crs::WGS84, "no CRS on input, defaulting");
        collection.crs = Some(Crs::WGS84);
    }

    Ok(collection)
}

/// Promeut les colonnes d'index multi-niveaux en colonnes ordinaires, en
/// tête du schéma visible
fn flatten_index(mut collection: Collection) -> Collection {
    if collection.index.is_empty() {
        return collection;
    }

    let mut columns = std::mem::take(&mut collection.index);
    for name in collection.columns.drain(..) {
        if !columns.contains(&name) {
            columns.push(name);
        }
    }
    collection.columns = columns;
    collection
}

/// Passe toutes les colonnes en minuscules. En cas de collision de casse
/// ("Name" et "NAME"), la première occurrence dans l'ordre du schéma gagne.
fn lowercase_columns(collection: &mut Collection) {
    let mut columns: Vec<String> = Vec::with_capacity(collection.columns.len());
    for name in &collection.columns {
        let lower = name.to_lowercase();
        if !columns.contains(&lower) {
            columns.push(lower);
        }
    }

    for record in &mut collection.records {
        let mut values = HashMap::with_capacity(record.values.len());
        for name in &collection.columns {
            if let Some(value) = record.values.remove(name) {
                values.entry(name.to_lowercase()).or_insert(value);
            }
        }
        record.values = values;
    }

    collection.columns = columns;
}

/// Dérive la colonne `id` depuis la première colonne candidate présente
fn derive_id(collection: &mut Collection, label: &str) -> Result<(), GeotableError> {
    let source = ID_CANDIDATES
        .iter()
        .find(|candidate| collection.has_column(candidate))
        .copied()
        .ok_or_else(|| {
            GeotableError::missing_identifier(
                label,
                format!(
                    "none of the candidate columns ({}) is present",
                    ID_CANDIDATES.join(", ")
                ),
            )
        })?;

    for (i, record) in collection.records.iter_mut().enumerate() {
        let id = record.get(source).to_id_string().ok_or_else(|| {
            GeotableError::missing_identifier(
                label,
                format!("record {} has a null '{}' value", i, source),
            )
        })?;
        record.set(ID_COLUMN, Value::Text(id));
    }

    collection.add_column(ID_COLUMN);
    Ok(())
}

/// Garantit la présence des colonnes attendues ; une colonne ajoutée se lit
/// comme nulle sur chaque enregistrement
fn ensure_expected_columns(collection: &mut Collection) {
    for name in EXPECTED_COLUMNS {
        collection.add_column(name);
    }
}
