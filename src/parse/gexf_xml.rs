//! Parser voor GEXF XML-documenten.

use std::str::FromStr;

use crate::graph::value::{AttrMap, AttrValue};
use crate::graph::{EdgeType, GexfGraph, GraphError, GraphOptions};
use crate::model::cast::cast_from_text;
use crate::model::{AttributeModel, FieldDecl, ModelError, extract_model};

use quick_xml::de::from_str;
use serde::Deserialize;
use thiserror::Error;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Result type voor parsing van GEXF-documenten.
pub type ParseResult<T> = Result<T, ParseError>;

/// Beschrijft fouten tijdens het parsen.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Het XML-document kon niet gede-serialiseerd worden.
    #[error("XML parsefout: {0}")]
    Xml(#[from] quick_xml::DeError),
    /// De invoer is geen herkenbaar GEXF-document.
    #[error("ongeldige GEXF-bron: {0}")]
    InvalidSource(String),
    /// Een attvalue of default verwijst buiten het model.
    #[error(transparent)]
    Model(#[from] ModelError),
    /// De graph weigerde een mutatie.
    #[error("ongeldige graphmutatie: {0}")]
    Graph(String),
    /// Fout uit de onderliggende tokenizer (streamingpad).
    #[error("XML leesfout: {0}")]
    Token(#[from] quick_xml::Error),
    /// Een XML-attribuut kon niet gelezen worden (streamingpad).
    #[error("ongeldig XML-attribuut: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),
    /// Niet-welgevormde XML in de stream.
    #[error("XML syntaxfout: {0}")]
    Syntax(String),
}

impl From<GraphError> for ParseError {
    fn from(err: GraphError) -> Self {
        Self::Graph(err.to_string())
    }
}

/// Leest een GEXF-document en bouwt er een graph van het gevraagde type
/// uit op.
pub fn parse_str<G: GexfGraph>(input: &str) -> ParseResult<G> {
    let trimmed = strip_xml_preamble(input);
    let prefix = trimmed.chars().take(8).collect::<String>().to_lowercase();

    if !prefix.starts_with("<gexf") {
        return Err(ParseError::InvalidSource(
            "geen <gexf> root gevonden".to_owned(),
        ));
    }

    parse_document(GexfDocument::from_str(input)?)
}

fn strip_xml_preamble(input: &str) -> &str {
    let trimmed = input.trim_start_matches(|c: char| c == '\u{feff}' || c.is_whitespace());
    if let Some(rest) = trimmed.strip_prefix("<?xml") {
        if let Some(idx) = rest.find("?>") {
            return rest[idx + 2..].trim_start();
        }
    }
    trimmed
}

/// Verwerkt een al gede-serialiseerd document tot een graph.
pub fn parse_document<G: GexfGraph>(document: GexfDocument) -> ParseResult<G> {
    let GexfDocument {
        version,
        meta,
        graph,
    } = document;

    let Some(raw_graph) = graph else {
        return Err(ParseError::InvalidSource(
            "document bevat geen <graph> element".to_owned(),
        ));
    };

    let mode = raw_graph.mode.as_deref().unwrap_or("static");
    let default_edge_type = raw_graph
        .defaultedgetype
        .as_deref()
        .map_or(EdgeType::Directed, EdgeType::from_tag);
    log::debug!(
        "Start parsing GEXF document (versie {}, mode {mode})",
        version.as_deref().unwrap_or("onbekend")
    );

    // Declaratieblokken per klasse; een later blok van dezelfde klasse
    // vervangt het eerdere, onbekende klassen worden genegeerd.
    let mut node_decls: Vec<FieldDecl> = Vec::new();
    let mut edge_decls: Vec<FieldDecl> = Vec::new();
    for block in raw_graph.attributes {
        match block.class.as_deref() {
            Some("node") => node_decls = block.fields.into_iter().map(FieldDecl::from).collect(),
            Some("edge") => edge_decls = block.fields.into_iter().map(FieldDecl::from).collect(),
            _ => {}
        }
    }

    let (node_model, node_defaults) = extract_model(&node_decls)?;
    let (edge_model, edge_defaults) = extract_model(&edge_decls)?;

    let mut graph = G::construct(GraphOptions {
        default_node_attributes: node_defaults,
        default_edge_attributes: edge_defaults,
        edge_type: default_edge_type,
    });

    if let Some(meta) = meta {
        apply_meta(&mut graph, meta);
    }

    let raw_nodes = raw_graph.nodes.nodes;
    log::debug!("{} nodes gevonden", raw_nodes.len());
    for (key, attributes) in collect_node_records(raw_nodes, &node_model)? {
        graph.add_node(&key, attributes)?;
    }

    let raw_edges = raw_graph.edges.edges;
    log::debug!("{} edges gevonden", raw_edges.len());
    for edge in raw_edges {
        let attributes =
            collect_attributes(&edge_model, edge.label.as_deref(), &edge.attvalues.values)?;
        let edge_type = edge
            .ty
            .as_deref()
            .map_or(default_edge_type, EdgeType::from_tag);

        match (edge.id, edge_type) {
            (Some(id), EdgeType::Directed) => {
                graph.add_directed_edge_with_key(&id, &edge.source, &edge.target, attributes)?;
            }
            (Some(id), EdgeType::Undirected) => {
                graph.add_undirected_edge_with_key(&id, &edge.source, &edge.target, attributes)?;
            }
            (None, EdgeType::Directed) => {
                graph.add_directed_edge(&edge.source, &edge.target, attributes)?;
            }
            (None, EdgeType::Undirected) => {
                graph.add_undirected_edge(&edge.source, &edge.target, attributes)?;
            }
        }
    }

    Ok(graph)
}

fn apply_meta<G: GexfGraph>(graph: &mut G, meta: RawMeta) {
    if let Some(date) = meta.lastmodifieddate {
        graph.set_attribute("lastModifiedDate", AttrValue::Text(date));
    }
    if let Some(creator) = meta.creator {
        graph.set_attribute("creator", AttrValue::Text(creator));
    }
    if let Some(keywords) = meta.keywords {
        graph.set_attribute("keywords", AttrValue::Text(keywords));
    }
    if let Some(description) = meta.description {
        graph.set_attribute("description", AttrValue::Text(description));
    }
    if let Some(title) = meta.title {
        graph.set_attribute("title", AttrValue::Text(title));
    }
}

/// Verzamelt de attributen van één node- of edge-element: het label
/// (indien aanwezig) plus elke attvalue, gecast volgens het model en
/// opgeslagen onder de veldtitel.
fn collect_attributes(
    model: &AttributeModel,
    label: Option<&str>,
    attvalues: &[RawAttValue],
) -> Result<AttrMap, ModelError> {
    let mut data = AttrMap::new();

    if let Some(label) = label {
        if !label.is_empty() {
            data.insert("label".to_owned(), AttrValue::Text(label.to_owned()));
        }
    }

    for attvalue in attvalues {
        let id = attvalue
            .id
            .as_deref()
            .or(attvalue.for_id.as_deref())
            .ok_or(ModelError::MissingId)?;
        let field = model
            .field(id)
            .ok_or_else(|| ModelError::UnknownField(id.to_owned()))?;
        data.insert(
            field.title.clone(),
            cast_from_text(field.ty, &attvalue.value),
        );
    }

    Ok(data)
}

fn node_record(node: RawNode, model: &AttributeModel) -> ParseResult<(String, AttrMap)> {
    let attributes = collect_attributes(model, node.label.as_deref(), &node.attvalues.values)?;
    Ok((node.id, attributes))
}

#[cfg(feature = "parallel")]
fn collect_node_records(
    nodes: Vec<RawNode>,
    model: &AttributeModel,
) -> ParseResult<Vec<(String, AttrMap)>> {
    nodes
        .into_par_iter()
        .map(|node| node_record(node, model))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn collect_node_records(
    nodes: Vec<RawNode>,
    model: &AttributeModel,
) -> ParseResult<Vec<(String, AttrMap)>> {
    nodes
        .into_iter()
        .map(|node| node_record(node, model))
        .collect()
}

/// Ruw gede-serialiseerd GEXF-document; te verkrijgen via [`FromStr`] en
/// te verwerken met [`parse_document`].
#[derive(Debug, Deserialize)]
pub struct GexfDocument {
    #[serde(rename = "@version")]
    version: Option<String>,
    #[serde(default)]
    meta: Option<RawMeta>,
    graph: Option<RawGraph>,
}

impl FromStr for GexfDocument {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(from_str(s)?)
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawMeta {
    #[serde(rename = "@lastmodifieddate")]
    lastmodifieddate: Option<String>,
    creator: Option<String>,
    keywords: Option<String>,
    description: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawGraph {
    #[serde(rename = "@mode")]
    mode: Option<String>,
    #[serde(rename = "@defaultedgetype")]
    defaultedgetype: Option<String>,
    #[serde(default, rename = "attributes")]
    attributes: Vec<RawAttributes>,
    #[serde(default)]
    nodes: RawNodes,
    #[serde(default)]
    edges: RawEdges,
}

#[derive(Debug, Default, Deserialize)]
struct RawAttributes {
    #[serde(rename = "@class")]
    class: Option<String>,
    #[serde(default, rename = "attribute")]
    fields: Vec<RawAttribute>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAttribute {
    #[serde(rename = "@id")]
    id: Option<String>,
    #[serde(rename = "@for")]
    for_id: Option<String>,
    #[serde(rename = "@type")]
    ty: Option<String>,
    #[serde(rename = "@title")]
    title: Option<String>,
    #[serde(default)]
    default: Option<String>,
}

impl From<RawAttribute> for FieldDecl {
    fn from(raw: RawAttribute) -> Self {
        Self {
            id: raw.id,
            for_id: raw.for_id,
            ty: raw.ty,
            title: raw.title,
            default: raw.default,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawNodes {
    #[serde(default, rename = "node")]
    nodes: Vec<RawNode>,
}

#[derive(Debug, Deserialize)]
struct RawNode {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@label")]
    label: Option<String>,
    #[serde(default)]
    attvalues: RawAttValues,
}

#[derive(Debug, Default, Deserialize)]
struct RawAttValues {
    #[serde(default, rename = "attvalue")]
    values: Vec<RawAttValue>,
}

#[derive(Debug, Deserialize)]
struct RawAttValue {
    #[serde(rename = "@id")]
    id: Option<String>,
    #[serde(rename = "@for")]
    for_id: Option<String>,
    #[serde(rename = "@value")]
    value: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawEdges {
    #[serde(default, rename = "edge")]
    edges: Vec<RawEdge>,
}

#[derive(Debug, Deserialize)]
struct RawEdge {
    #[serde(rename = "@id")]
    id: Option<String>,
    #[serde(rename = "@type")]
    ty: Option<String>,
    #[serde(rename = "@label")]
    label: Option<String>,
    #[serde(rename = "@source")]
    source: String,
    #[serde(rename = "@target")]
    target: String,
    #[serde(default)]
    attvalues: RawAttValues,
}
