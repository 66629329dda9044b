//! Fallback PROJ pour les paires EPSG hors du chemin Rust pur
//!
//! Ce module est disponible uniquement avec la feature `reproject`.

use proj::Proj;

use crate::error::GeotableError;
use crate::types::Crs;

/// Reprojection via la bibliothèque PROJ
pub struct ProjReprojector {
    proj: Proj,
}

impl ProjReprojector {
    pub fn new(source: Crs, target: Crs) -> Result<Self, GeotableError> {
        let proj = Proj::new_known_crs(&source.to_string(), &target.to_string(), None)
            .map_err(|e| GeotableError::Proj(e.to_string()))?;
        Ok(Self { proj })
    }

    pub fn transform(&self, x: f64, y: f64) -> Result<(f64, f64), GeotableError> {
        self.proj
            .convert((x, y))
            .map_err(|e| GeotableError::Proj(e.to_string()))
    }
}
