//! Collaborateurs d'E/S fichier : vecteur (GeoJSON) et tabulaire à plat

pub mod csv;
pub mod geojson;
