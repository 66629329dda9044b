//! Types de données pour le crate geotable

use std::collections::HashMap;
use std::fmt;

use geo::{Geometry, HasDimensions};

static NULL: Value = Value::Null;

/// Valeur scalaire d'un attribut
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Chaîne de caractères
    Text(String),
    /// Nombre (toujours stocké en f64)
    Number(f64),
    /// Valeur absente
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Rendu comme identifiant : les nombres entiers perdent leur partie
    /// fractionnaire ("123" et non "123.0"). Retourne `None` pour une valeur
    /// nulle, une chaîne vide ou un nombre non fini.
    pub fn to_id_string(&self) -> Option<String> {
        match self {
            Value::Text(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) if n.is_finite() => {
                if n.fract() == 0.0 && n.abs() < 9.0e15 {
                    Some(format!("{}", *n as i64))
                } else {
                    Some(n.to_string())
                }
            }
            _ => None,
        }
    }

    /// Rendu pour l'export tabulaire à plat : null, infini et NaN
    /// deviennent une chaîne vide
    pub fn to_field_string(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Number(n) if !n.is_finite() => String::new(),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => {
                format!("{}", *n as i64)
            }
            Value::Number(n) => n.to_string(),
            Value::Null => String::new(),
        }
    }
}

/// Un enregistrement : géométrie optionnelle + attributs nommés
#[derive(Debug, Clone, Default)]
pub struct Record {
    /// Géométrie (Point, LineString, Polygon...), possiblement absente
    pub geometry: Option<Geometry>,

    /// Attributs de l'enregistrement (colonne -> valeur)
    pub values: HashMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_geometry(geometry: Geometry) -> Self {
        Self {
            geometry: Some(geometry),
            values: HashMap::new(),
        }
    }

    /// Lit la valeur d'une colonne ; une colonne absente se lit comme nulle
    pub fn get(&self, column: &str) -> &Value {
        self.values.get(column).unwrap_or(&NULL)
    }

    pub fn set(&mut self, column: impl Into<String>, value: Value) {
        self.values.insert(column.into(), value);
    }

    /// Géométrie exploitable : présente et non vide
    pub fn usable_geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref().filter(|g| !g.is_empty())
    }

    pub fn has_geometry(&self) -> bool {
        self.usable_geometry().is_some()
    }
}

/// Système de coordonnées, identifié par son code EPSG
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crs {
    /// Code EPSG
    pub epsg: u32,
}

impl Crs {
    /// Référence géographique par défaut (WGS84)
    pub const WGS84: Crs = Crs { epsg: 4326 };

    /// Référence plane fixe pour tous les calculs métriques (Web Mercator)
    pub const WEB_MERCATOR: Crs = Crs { epsg: 3857 };

    pub fn new(epsg: u32) -> Self {
        Self { epsg }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

/// Collection ordonnée d'enregistrements partageant un même schéma
#[derive(Debug, Clone, Default)]
pub struct Collection {
    /// Schéma : liste ordonnée des colonnes visibles
    pub columns: Vec<String>,

    /// Colonnes d'index multi-niveaux, non promues dans le schéma visible
    /// (la normalisation les aplatit)
    pub index: Vec<String>,

    /// Enregistrements, dans l'ordre
    pub records: Vec<Record>,

    /// CRS de la collection entière (jamais par enregistrement)
    pub crs: Option<Crs>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Ajoute une colonne au schéma si elle n'y figure pas déjà ; les
    /// enregistrements existants la lisent comme nulle
    pub fn add_column(&mut self, name: &str) {
        if !self.has_column(name) {
            self.columns.push(name.to_string());
        }
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
