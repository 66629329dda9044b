//! # geotable
//!
//! Collections tabulaires à géométrie : normalisation de schéma, projection
//! et conflation de deux sources indépendantes décrivant les mêmes objets
//! réels.
//!
//! ## Features
//!
//! - Normalisation de schéma : identifiant canonique `id`, colonnes
//!   attendues garanties, CRS géographique par défaut
//! - Reprojection WGS84 ↔ Web Mercator en Rust pur (autres paires EPSG via
//!   la feature `reproject`)
//! - Jointure externe sur identifiant avec précédence primaire fixe
//! - Mise en forme des colonnes pour l'export
//!
//! ## Usage
//!
//! ```rust,ignore
//! use geotable::{conflate, normalize};
//!
//! let primary = normalize(local, "local")?;
//! let secondary = normalize(remote, "remote")?;
//! let outcome = conflate(primary, secondary)?;
//! println!("{} objets fusionnés", outcome.collection.len());
//! ```

pub mod error;
pub mod format;
pub mod merge;
pub mod project;
pub mod reproject;
pub mod schema;
pub mod types;

pub use error::GeotableError;
pub use merge::{conflate, MergeOutcome, MergeReport};
pub use project::project;
pub use schema::normalize;
pub use types::{Collection, Crs, Record, Value};
