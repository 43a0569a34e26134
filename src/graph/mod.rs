//! Kern datastructuren voor het modelleren van attribuutgrafen.

use std::collections::HashMap;
use std::fmt;

pub mod value;

use value::{AttrMap, AttrValue};

/// Richting van een edge of van de graph als geheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeType {
    #[default]
    Directed,
    Undirected,
}

impl EdgeType {
    /// Leest een GEXF `defaultedgetype`/`type` waarde. Het literale
    /// `mutual` wordt genormaliseerd naar `undirected`; onbekende
    /// waarden vallen terug op `directed`.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "undirected" | "mutual" => Self::Undirected,
            _ => Self::Directed,
        }
    }

    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Directed => "directed",
            Self::Undirected => "undirected",
        }
    }
}

/// Constructie-opties voor een graph-instantie.
#[derive(Debug, Clone, Default)]
pub struct GraphOptions {
    /// Standaardattributen die elke node krijgt, tenzij expliciet
    /// overschreven.
    pub default_node_attributes: AttrMap,
    /// Standaardattributen die elke edge krijgt.
    pub default_edge_attributes: AttrMap,
    /// Standaardrichting voor edges zonder expliciet type.
    pub edge_type: EdgeType,
}

/// Capability-interface waarmee de parser en writer een graph consumeren.
///
/// De parser bouwt via deze interface een graph op; de writer leest er
/// een via dezelfde interface uit. [`Graph`] is de meegeleverde
/// implementatie.
pub trait GexfGraph: Sized {
    /// Maak een lege graph aan met de meegegeven standaardinstellingen.
    fn construct(options: GraphOptions) -> Self;

    /// Voeg een node toe onder de gegeven sleutel.
    fn add_node(&mut self, key: &str, attributes: AttrMap) -> Result<(), GraphError>;

    /// Voeg een gerichte edge toe; de graph kent zelf een sleutel toe.
    fn add_directed_edge(
        &mut self,
        source: &str,
        target: &str,
        attributes: AttrMap,
    ) -> Result<String, GraphError>;

    /// Voeg een gerichte edge toe onder een expliciete sleutel.
    fn add_directed_edge_with_key(
        &mut self,
        key: &str,
        source: &str,
        target: &str,
        attributes: AttrMap,
    ) -> Result<(), GraphError>;

    /// Voeg een ongerichte edge toe; de graph kent zelf een sleutel toe.
    fn add_undirected_edge(
        &mut self,
        source: &str,
        target: &str,
        attributes: AttrMap,
    ) -> Result<String, GraphError>;

    /// Voeg een ongerichte edge toe onder een expliciete sleutel.
    fn add_undirected_edge_with_key(
        &mut self,
        key: &str,
        source: &str,
        target: &str,
        attributes: AttrMap,
    ) -> Result<(), GraphError>;

    /// Attributen op graph-niveau (metadata).
    fn attributes(&self) -> &AttrMap;

    /// Zet een attribuut op graph-niveau.
    fn set_attribute(&mut self, key: &str, value: AttrValue);

    /// Alle nodesleutels, in invoegvolgorde.
    fn nodes(&self) -> Vec<&str>;

    /// Alle edgesleutels, in invoegvolgorde.
    fn edges(&self) -> Vec<&str>;

    /// Attributen van een node.
    fn node_attributes(&self, key: &str) -> Option<&AttrMap>;

    /// Attributen van een edge.
    fn edge_attributes(&self, key: &str) -> Option<&AttrMap>;

    /// Bronnode van een edge.
    fn source(&self, key: &str) -> Option<&str>;

    /// Doelnode van een edge.
    fn target(&self, key: &str) -> Option<&str>;

    /// `Some(true)` voor een gerichte edge, `Some(false)` voor een
    /// ongerichte, `None` voor een onbekende sleutel.
    fn is_directed(&self, key: &str) -> Option<bool>;

    /// Aantal nodes.
    fn order(&self) -> usize;

    /// Aantal edges.
    fn size(&self) -> usize;

    /// De standaardrichting waarmee de graph is aangemaakt.
    fn edge_type(&self) -> EdgeType;

    /// Of de graph meerdere edges tussen hetzelfde nodepaar toestaat.
    fn multi(&self) -> bool;
}

#[derive(Debug, Clone)]
struct NodeEntry {
    key: String,
    attributes: AttrMap,
}

#[derive(Debug, Clone)]
struct EdgeEntry {
    key: String,
    source: String,
    target: String,
    directed: bool,
    attributes: AttrMap,
}

/// Graph container met indices voor snelle lookups.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    attributes: AttrMap,
    default_node_attributes: AttrMap,
    default_edge_attributes: AttrMap,
    graph_edge_type: EdgeType,
    nodes: Vec<NodeEntry>,
    node_index: HashMap<String, usize>,
    edges: Vec<EdgeEntry>,
    edge_index: HashMap<String, usize>,
    next_edge_key: usize,
}

impl Graph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gewicht van een edge; valt terug op `1.0` wanneer er geen
    /// numeriek `weight`-attribuut aanwezig is.
    #[must_use]
    pub fn edge_weight(&self, key: &str) -> f64 {
        self.edge_attributes(key)
            .and_then(|attributes| attributes.get("weight"))
            .and_then(AttrValue::as_number)
            .unwrap_or(1.0)
    }

    fn merged(defaults: &AttrMap, attributes: AttrMap) -> AttrMap {
        if defaults.is_empty() {
            return attributes;
        }
        let mut merged = defaults.clone();
        merged.extend(attributes);
        merged
    }

    fn insert_edge(
        &mut self,
        key: String,
        source: &str,
        target: &str,
        directed: bool,
        attributes: AttrMap,
    ) -> Result<(), GraphError> {
        if !self.node_index.contains_key(source) {
            return Err(GraphError::UnknownNode(source.to_owned()));
        }
        if !self.node_index.contains_key(target) {
            return Err(GraphError::UnknownNode(target.to_owned()));
        }
        if self.edge_index.contains_key(&key) {
            return Err(GraphError::DuplicateEdge(key));
        }

        let attributes = Self::merged(&self.default_edge_attributes, attributes);
        self.edge_index.insert(key.clone(), self.edges.len());
        self.edges.push(EdgeEntry {
            key,
            source: source.to_owned(),
            target: target.to_owned(),
            directed,
            attributes,
        });
        Ok(())
    }

    fn assign_edge_key(&mut self) -> String {
        loop {
            let key = format!("e{}", self.next_edge_key);
            self.next_edge_key += 1;
            if !self.edge_index.contains_key(&key) {
                return key;
            }
        }
    }
}

impl GexfGraph for Graph {
    fn construct(options: GraphOptions) -> Self {
        Self {
            default_node_attributes: options.default_node_attributes,
            default_edge_attributes: options.default_edge_attributes,
            graph_edge_type: options.edge_type,
            ..Self::default()
        }
    }

    fn add_node(&mut self, key: &str, attributes: AttrMap) -> Result<(), GraphError> {
        if self.node_index.contains_key(key) {
            return Err(GraphError::DuplicateNode(key.to_owned()));
        }
        let attributes = Self::merged(&self.default_node_attributes, attributes);
        self.node_index.insert(key.to_owned(), self.nodes.len());
        self.nodes.push(NodeEntry {
            key: key.to_owned(),
            attributes,
        });
        Ok(())
    }

    fn add_directed_edge(
        &mut self,
        source: &str,
        target: &str,
        attributes: AttrMap,
    ) -> Result<String, GraphError> {
        let key = self.assign_edge_key();
        self.insert_edge(key.clone(), source, target, true, attributes)?;
        Ok(key)
    }

    fn add_directed_edge_with_key(
        &mut self,
        key: &str,
        source: &str,
        target: &str,
        attributes: AttrMap,
    ) -> Result<(), GraphError> {
        self.insert_edge(key.to_owned(), source, target, true, attributes)
    }

    fn add_undirected_edge(
        &mut self,
        source: &str,
        target: &str,
        attributes: AttrMap,
    ) -> Result<String, GraphError> {
        let key = self.assign_edge_key();
        self.insert_edge(key.clone(), source, target, false, attributes)?;
        Ok(key)
    }

    fn add_undirected_edge_with_key(
        &mut self,
        key: &str,
        source: &str,
        target: &str,
        attributes: AttrMap,
    ) -> Result<(), GraphError> {
        self.insert_edge(key.to_owned(), source, target, false, attributes)
    }

    fn attributes(&self) -> &AttrMap {
        &self.attributes
    }

    fn set_attribute(&mut self, key: &str, value: AttrValue) {
        self.attributes.insert(key.to_owned(), value);
    }

    fn nodes(&self) -> Vec<&str> {
        self.nodes.iter().map(|node| node.key.as_str()).collect()
    }

    fn edges(&self) -> Vec<&str> {
        self.edges.iter().map(|edge| edge.key.as_str()).collect()
    }

    fn node_attributes(&self, key: &str) -> Option<&AttrMap> {
        self.node_index
            .get(key)
            .and_then(|idx| self.nodes.get(*idx))
            .map(|node| &node.attributes)
    }

    fn edge_attributes(&self, key: &str) -> Option<&AttrMap> {
        self.edge_index
            .get(key)
            .and_then(|idx| self.edges.get(*idx))
            .map(|edge| &edge.attributes)
    }

    fn source(&self, key: &str) -> Option<&str> {
        self.edge_index
            .get(key)
            .and_then(|idx| self.edges.get(*idx))
            .map(|edge| edge.source.as_str())
    }

    fn target(&self, key: &str) -> Option<&str> {
        self.edge_index
            .get(key)
            .and_then(|idx| self.edges.get(*idx))
            .map(|edge| edge.target.as_str())
    }

    fn is_directed(&self, key: &str) -> Option<bool> {
        self.edge_index
            .get(key)
            .and_then(|idx| self.edges.get(*idx))
            .map(|edge| edge.directed)
    }

    fn order(&self) -> usize {
        self.nodes.len()
    }

    fn size(&self) -> usize {
        self.edges.len()
    }

    fn edge_type(&self) -> EdgeType {
        self.graph_edge_type
    }

    fn multi(&self) -> bool {
        true
    }
}

/// Fouten die kunnen optreden bij het opbouwen van de graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    DuplicateNode(String),
    DuplicateEdge(String),
    UnknownNode(String),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateNode(key) => write!(f, "node `{key}` bestaat al in de graph"),
            Self::DuplicateEdge(key) => write!(f, "edge `{key}` bestaat al in de graph"),
            Self::UnknownNode(key) => write!(f, "node `{key}` niet gevonden in graph"),
        }
    }
}

impl std::error::Error for GraphError {}
