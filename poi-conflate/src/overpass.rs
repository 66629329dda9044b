//! Requête de features distantes via l'API Overpass
//!
//! Construit une requête Overpass QL depuis un nom de lieu et un filtre de
//! tags, l'exécute, et convertit la réponse JSON en collection brute
//! (index element_type/osmid, tags en attributs, géométries WGS84).

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use geo::{Coord, Geometry, LineString, MultiPolygon, Point, Polygon};
use serde::Deserialize;
use tracing::{debug, info, warn};

use geotable::{Collection, Crs, Record, Value};

use crate::config::{TagFilter, TagSelector};
use crate::error::PipelineError;

/// Point d'accès Overpass par défaut (surchargé par OVERPASS_URL)
const DEFAULT_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";

/// Budget serveur de la requête, en secondes
const QUERY_TIMEOUT_SECS: u64 = 180;

/// Client de la requête de features distantes
pub struct OverpassClient {
    endpoint: String,
    client: reqwest::Client,
}

impl OverpassClient {
    /// Construit le client depuis l'environnement : endpoint via
    /// `OVERPASS_URL`, proxy système via les variables habituelles
    pub fn from_env() -> Result<Self> {
        let endpoint =
            std::env::var("OVERPASS_URL").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(QUERY_TIMEOUT_SECS + 30))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { endpoint, client })
    }

    /// Interroge la source distante pour un lieu et un filtre de tags.
    ///
    /// Une réponse sans aucun objet exploitable est une erreur
    /// (`EmptyResult`), distincte d'un échec de la requête elle-même.
    pub async fn fetch(&self, place: &str, filter: &TagFilter) -> Result<Collection> {
        let query = build_query(place, filter);
        debug!(%query, "overpass query");
        info!(place, endpoint = %self.endpoint, "querying remote features");

        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("data", query.as_str())])
            .send()
            .await
            .context("Overpass request failed")?
            .error_for_status()
            .context("Overpass returned an error status")?
            .json::<OverpassResponse>()
            .await
            .context("Failed to parse Overpass response")?;

        let collection = collection_from_elements(response.elements);
        if collection.is_empty() {
            return Err(PipelineError::EmptyResult {
                place: place.to_string(),
            }
            .into());
        }

        info!(features = collection.len(), "remote features received");
        Ok(collection)
    }
}

/// Construit la requête Overpass QL : zone nommée, une clause `nwr` par
/// clé du filtre, géométries incluses dans la sortie
pub fn build_query(place: &str, filter: &TagFilter) -> String {
    let area = escape_literal(place);
    let mut query = format!(
        "[out:json][timeout:{}];\narea[\"name\"=\"{}\"]->.zone;\n(\n",
        QUERY_TIMEOUT_SECS, area
    );

    for (key, selector) in &filter.tags {
        match selector {
            TagSelector::Any(true) => {
                query.push_str(&format!("  nwr[\"{}\"](area.zone);\n", key));
            }
            TagSelector::Any(false) => {}
            TagSelector::Values(values) if !values.is_empty() => {
                query.push_str(&format!(
                    "  nwr[\"{}\"~\"^({})$\"](area.zone);\n",
                    key,
                    values.join("|")
                ));
            }
            TagSelector::Values(_) => {}
        }
    }

    query.push_str(");\nout tags geom;\n");
    query
}

fn escape_literal(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    element_type: String,
    id: u64,
    #[serde(default)]
    tags: BTreeMap<String, String>,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    geometry: Vec<OverpassVertex>,
    #[serde(default)]
    members: Vec<OverpassMember>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct OverpassVertex {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OverpassMember {
    #[serde(rename = "type")]
    member_type: String,
    #[serde(default)]
    role: String,
    #[serde(default)]
    geometry: Vec<OverpassVertex>,
}

impl OverpassElement {
    fn build_geometry(&self) -> Option<Geometry> {
        match self.element_type.as_str() {
            "node" => match (self.lon, self.lat) {
                (Some(lon), Some(lat)) => Some(Geometry::Point(Point::new(lon, lat))),
                _ => None,
            },
            "way" => ring_or_line(&self.geometry),
            "relation" => self.build_multipolygon(),
            _ => None,
        }
    }

    /// Assemble un (multi)polygone depuis les membres `outer` fermés d'une
    /// relation. Les anneaux intérieurs ne sont pas creusés.
    fn build_multipolygon(&self) -> Option<Geometry> {
        let mut outers: Vec<Polygon> = self
            .members
            .iter()
            .filter(|m| m.member_type == "way" && m.role == "outer")
            .filter_map(|m| closed_ring(&m.geometry))
            .map(|ring| Polygon::new(ring, vec![]))
            .collect();

        match outers.len() {
            0 => None,
            1 => outers.pop().map(Geometry::Polygon),
            _ => Some(Geometry::MultiPolygon(MultiPolygon::new(outers))),
        }
    }
}

fn coords(vertices: &[OverpassVertex]) -> Vec<Coord> {
    vertices.iter().map(|v| Coord { x: v.lon, y: v.lat }).collect()
}

/// Un chemin fermé (premier == dernier sommet, au moins 4 sommets)
fn closed_ring(vertices: &[OverpassVertex]) -> Option<LineString> {
    let coords = coords(vertices);
    if coords.len() >= 4 && coords.first() == coords.last() {
        Some(LineString::new(coords))
    } else {
        None
    }
}

/// Un chemin devient un polygone s'il est fermé, une ligne sinon
fn ring_or_line(vertices: &[OverpassVertex]) -> Option<Geometry> {
    if let Some(ring) = closed_ring(vertices) {
        return Some(Geometry::Polygon(Polygon::new(ring, vec![])));
    }
    let coords = coords(vertices);
    if coords.len() >= 2 {
        Some(Geometry::LineString(LineString::new(coords)))
    } else {
        None
    }
}

/// Convertit les éléments de la réponse en collection brute : index
/// multi-niveaux element_type/osmid, tags en colonnes, CRS géographique
fn collection_from_elements(elements: Vec<OverpassElement>) -> Collection {
    let mut collection = Collection::new();
    collection.index = vec!["element_type".to_string(), "osmid".to_string()];
    collection.crs = Some(Crs::WGS84);

    for element in elements {
        let geometry = element.build_geometry();
        if geometry.is_none() {
            warn!(
                element_type = %element.element_type,
                id = element.id,
                "skipping element without buildable geometry"
            );
            continue;
        }

        let mut record = Record::new();
        record.geometry = geometry;
        record.set("element_type", Value::Text(element.element_type));
        record.set("osmid", Value::Number(element.id as f64));
        for (key, value) in element.tags {
            collection.add_column(&key);
            record.set(key, Value::Text(value));
        }
        collection.push(record);
    }

    collection
}
