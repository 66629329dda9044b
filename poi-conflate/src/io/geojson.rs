//! Lecture et écriture GeoJSON
//!
//! Lecture via le crate geojson (FeatureCollection -> Collection, membre
//! `crs` hérité honoré quand présent). Écriture en streaming avec geozero,
//! sans matérialiser le document en mémoire.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use geozero::geojson::GeoJsonWriter;
use geozero::GeozeroGeometry;
use tracing::warn;

use geotable::{Collection, Crs, Record, Value};

use crate::error::PipelineError;

/// Lit une FeatureCollection GeoJSON en collection.
///
/// Le membre étranger `crs` (urn EPSG, style historique) est honoré quand
/// présent ; sinon le CRS reste indéfini et la normalisation le défaut.
pub fn read(path: &Path) -> Result<Collection, PipelineError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| PipelineError::file_load(path, e.to_string()))?;

    let parsed: geojson::GeoJson = content
        .parse()
        .map_err(|e: geojson::Error| PipelineError::file_load(path, e.to_string()))?;

    let feature_collection = match parsed {
        geojson::GeoJson::FeatureCollection(fc) => fc,
        _ => {
            return Err(PipelineError::file_load(
                path,
                "expected a FeatureCollection",
            ))
        }
    };

    let mut collection = Collection::new();
    collection.crs = crs_from_foreign_members(feature_collection.foreign_members.as_ref());

    for feature in feature_collection.features {
        let mut record = Record::new();

        record.geometry = feature.geometry.and_then(|g| {
            match geo::Geometry::try_from(g.value) {
                Ok(geometry) => Some(geometry),
                Err(e) => {
                    warn!(error = %e, "unsupported geometry in input, treated as absent");
                    None
                }
            }
        });

        if let Some(properties) = feature.properties {
            for (key, value) in properties {
                if value.is_null() {
                    // Une propriété nulle se lit comme une colonne absente
                    continue;
                }
                collection.add_column(&key);
                record.set(key, json_to_value(value));
            }
        }

        collection.push(record);
    }

    Ok(collection)
}

/// Écrit une collection en FeatureCollection GeoJSON (streaming).
///
/// Les valeurs nulles sont conservées telles quelles dans les propriétés :
/// le chemin d'export géométrique ne les remplace jamais.
pub fn write(collection: &Collection, path: &Path) -> Result<()> {
    let file = File::create(path)
        .context(format!("Failed to create file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    // Header FeatureCollection avec CRS
    write!(writer, r#"{{"type":"FeatureCollection""#)?;
    if let Some(crs) = collection.crs {
        write!(
            writer,
            r#","crs":{{"type":"name","properties":{{"name":"urn:ogc:def:crs:EPSG::{}"}}}}"#,
            crs.epsg
        )?;
    }
    write!(writer, r#","features":["#)?;

    for (i, record) in collection.records.iter().enumerate() {
        if i > 0 {
            write!(writer, ",")?;
        }
        write_feature(&mut writer, &collection.columns, record)?;
    }

    write!(writer, "]}}")?;
    writer.flush()?;

    Ok(())
}

/// Écrit une feature en GeoJSON
fn write_feature<W: Write>(writer: &mut W, columns: &[String], record: &Record) -> Result<()> {
    write!(writer, r#"{{"type":"Feature","geometry":"#)?;

    // Geometry via geozero (efficace, zero-copy) ; null si absente
    match &record.geometry {
        Some(geometry) => {
            let mut geom_buf = Vec::new();
            let mut geom_writer = GeoJsonWriter::new(&mut geom_buf);
            geometry.process_geom(&mut geom_writer)?;
            writer.write_all(&geom_buf)?;
        }
        None => write!(writer, "null")?,
    }

    write!(writer, r#","properties":{{"#)?;
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            write!(writer, ",")?;
        }
        write!(writer, r#""{}":"#, escape_json(column))?;
        match record.get(column) {
            Value::Text(s) => write!(writer, r#""{}""#, escape_json(s))?,
            Value::Number(n) if n.is_finite() => write!(writer, "{}", n)?,
            _ => write!(writer, "null")?,
        }
    }
    write!(writer, "}}}}")?;

    Ok(())
}

/// Échappe une chaîne pour JSON
fn escape_json(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            c if c.is_control() => {
                result.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => result.push(c),
        }
    }
    result
}

/// Extrait le code EPSG du membre étranger `crs`, s'il est présent et lisible
fn crs_from_foreign_members(foreign: Option<&geojson::JsonObject>) -> Option<Crs> {
    let name = foreign?
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()?;
    let epsg: u32 = name.rsplit(':').next()?.parse().ok()?;
    Some(Crs::new(epsg))
}

fn json_to_value(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::String(s) => Value::Text(s),
        serde_json::Value::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
        serde_json::Value::Bool(b) => Value::Text(b.to_string()),
        serde_json::Value::Null => Value::Null,
        other => Value::Text(other.to_string()),
    }
}
