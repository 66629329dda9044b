//! Export tabulaire à plat (texte délimité)
//!
//! La géométrie n'est pas transportée : seules les colonnes du schéma sont
//! écrites, une ligne d'en-tête puis une ligne par enregistrement, valeurs
//! nulles rendues comme champs vides.

use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use encoding_rs::{Encoding, UTF_8};

use geotable::Collection;

/// BOM UTF-8, écrit en tête de fichier pour l'encodage `utf-8-sig`
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Résout une étiquette d'encodage. `utf-8-sig` est l'UTF-8 précédé d'un
/// BOM, comme attendu par les tableurs.
fn resolve_encoding(label: &str) -> Result<(&'static Encoding, bool)> {
    if label.eq_ignore_ascii_case("utf-8-sig") {
        return Ok((UTF_8, true));
    }
    Encoding::for_label(label.as_bytes())
        .map(|encoding| (encoding, false))
        .ok_or_else(|| anyhow!("Unknown encoding '{label}'"))
}

/// Écrit la collection en texte délimité avec ligne d'en-tête
pub fn write(
    collection: &Collection,
    path: &Path,
    delimiter: u8,
    encoding_label: &str,
) -> Result<()> {
    let (encoding, bom) = resolve_encoding(encoding_label)?;

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer
        .write_record(&collection.columns)
        .context("Writing CSV header")?;

    for record in &collection.records {
        let row: Vec<String> = collection
            .columns
            .iter()
            .map(|column| record.get(column).to_field_string())
            .collect();
        writer.write_record(&row).context("Writing CSV row")?;
    }

    let buffer = writer
        .into_inner()
        .map_err(|e| anyhow!("Flushing CSV buffer: {}", e))?;
    let text = String::from_utf8(buffer).context("CSV buffer is not valid UTF-8")?;
    let (encoded, _, _) = encoding.encode(&text);

    let mut file = std::fs::File::create(path)
        .context(format!("Failed to create file: {}", path.display()))?;
    if bom {
        file.write_all(UTF8_BOM)?;
    }
    file.write_all(&encoded)?;

    Ok(())
}
