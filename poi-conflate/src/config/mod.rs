//! Configuration du filtre de tags
//!
//! Décrit quelles catégories d'objets demander à la source distante :
//! pour chaque clé de tag, soit toute valeur est acceptée, soit une liste
//! de valeurs énumérées.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Sélecteur de valeurs pour une clé de tag
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TagSelector {
    /// `true` : toute valeur de la clé ; `false` : clé ignorée
    Any(bool),
    /// Valeurs acceptées pour la clé
    Values(Vec<String>),
}

/// Filtre de tags : clé de tag -> sélecteur
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TagFilter {
    #[serde(flatten)]
    pub tags: BTreeMap<String, TagSelector>,
}

impl TagFilter {
    /// Charge un filtre depuis un fichier JSON
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read filter file: {}", path.display()))?;
        serde_json::from_str(&content).context("Failed to parse filter JSON")
    }

    /// Charge un filtre depuis un preset embarqué
    pub fn from_preset(preset: &str) -> Result<Self> {
        match preset {
            "social" => Self::load_embedded(include_str!("presets/social.json")),
            _ => anyhow::bail!("Unknown preset: {}. Use: social", preset),
        }
    }

    /// Résout une spécification de filtre : chemin de fichier s'il existe,
    /// sinon nom de preset
    pub fn resolve(spec: &str) -> Result<Self> {
        let path = Path::new(spec);
        if path.exists() {
            Self::load(path)
        } else {
            Self::from_preset(spec)
        }
    }

    fn load_embedded(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse embedded filter")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_social_preset_loads() {
        let filter = TagFilter::from_preset("social").unwrap();
        assert!(matches!(
            filter.tags.get("amenity"),
            Some(TagSelector::Any(true))
        ));
        match filter.tags.get("shop") {
            Some(TagSelector::Values(values)) => {
                assert!(values.contains(&"supermarket".to_string()));
            }
            other => panic!("Expected enumerated values for shop, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_preset_fails() {
        assert!(TagFilter::from_preset("nope").is_err());
    }

    #[test]
    fn test_parse_mixed_filter() {
        let filter: TagFilter =
            serde_json::from_str(r#"{"amenity": true, "shop": ["bakery"]}"#).unwrap();
        assert_eq!(filter.tags.len(), 2);
    }
}
