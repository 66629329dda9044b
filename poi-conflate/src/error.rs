//! Erreurs fatales du pipeline
//!
//! Toutes abandonnent l'exécution après un message lisible : pipeline batch,
//! une seule passe, pas de sortie partielle ni de reprise.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// La requête distante a abouti mais n'a renvoyé aucun objet.
    /// Distinct d'un échec de requête (transport, HTTP), qui remonte par
    /// le contexte d'erreur de la requête elle-même.
    #[error("No features found for place '{place}'; check the place name and the tag filter")]
    EmptyResult { place: String },

    /// Fichier d'entrée illisible ou invalide
    #[error("Failed to load {}: {reason}", .path.display())]
    FileLoad { path: PathBuf, reason: String },
}

impl PipelineError {
    /// Crée une erreur de chargement de fichier avec contexte
    pub fn file_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::FileLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
