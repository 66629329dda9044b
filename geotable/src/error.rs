//! Types d'erreurs pour le crate geotable

use thiserror::Error;

/// Erreurs pouvant survenir lors de la normalisation ou de la conflation
#[derive(Debug, Error)]
pub enum GeotableError {
    /// Aucun identifiant exploitable dans la collection
    #[error("Missing identifier in collection '{collection}': {reason}")]
    MissingIdentifier { collection: String, reason: String },

    /// CRS absent au moment d'un calcul géométrique
    #[error("Collection has no CRS defined; normalize it before any geometric computation")]
    UndefinedCrs,

    /// Paire de CRS hors du chemin Rust pur, sans la feature `reproject`
    #[error(
        "Unsupported reprojection EPSG:{src} -> EPSG:{target}. \
         Supported without the 'reproject' feature: 4326 <-> 3857. \
         For other pairs, build with: cargo build --features reproject"
    )]
    UnsupportedReprojection { src: u32, target: u32 },

    /// Type de géométrie que le reprojecteur ne sait pas parcourir
    #[error("Unsupported geometry type for reprojection: {0}")]
    UnsupportedGeometry(&'static str),

    /// Erreur remontée par la bibliothèque PROJ
    #[cfg(feature = "reproject")]
    #[error("PROJ transformation failed: {0}")]
    Proj(String),
}

impl GeotableError {
    /// Crée une erreur d'identifiant manquant avec contexte
    pub fn missing_identifier(collection: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MissingIdentifier {
            collection: collection.into(),
            reason: reason.into(),
        }
    }
}
