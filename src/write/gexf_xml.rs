//! Writer voor GEXF XML-documenten.

use std::io::Write;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use thiserror::Error;

use crate::graph::value::{AttrMap, AttrValue};
use crate::graph::{EdgeType, GexfGraph};
use crate::model::cast::cast_to_text;
use crate::model::{AttributeModel, infer_model};

const GEXF_NAMESPACE: &str = "http://www.gexf.net/1.2draft";
const VIZ_NAMESPACE: &str = "http://www.gexf.net/1.1draft/viz";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str =
    "http://www.gexf.net/1.2draft http://www.gexf.net/1.2draft/gexf.xsd";

/// Gereserveerde visualisatiesleutels; deze horen in het viz-bucket en
/// nooit tussen de gewone attributen.
const VIZ_KEYS: &[&str] = &["color", "size", "x", "y", "z", "shape", "thickness"];

/// Result type voor het wegschrijven van GEXF-documenten.
pub type WriteResult<T> = Result<T, WriteError>;

/// Beschrijft fouten tijdens het schrijven.
#[derive(Debug, Error)]
pub enum WriteError {
    /// De onderliggende XML-writer weigerde een event.
    #[error("XML schrijffout: {0}")]
    Xml(#[from] quick_xml::Error),
    /// De uitvoerbuffer bevat geen geldige UTF-8.
    #[error("uitvoer is geen geldige UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Eén element, gereduceerd tot de drie vaste buckets. Viz-sleutels
/// worden herkend maar niet opnieuw uitgeschreven; het leespad en het
/// schrijfpad zijn voor visualisatie bewust niet elkaars inverse.
#[derive(Debug, Default)]
struct Reduced {
    label: Option<String>,
    attributes: AttrMap,
}

fn reduce(attributes: Option<&AttrMap>) -> Reduced {
    let mut reduced = Reduced::default();
    let Some(map) = attributes else {
        return reduced;
    };
    for (key, value) in map {
        if key == "label" {
            reduced.label = Some(cast_to_text(value));
        } else if VIZ_KEYS.contains(&key.as_str()) {
            // viz-bucket
        } else {
            reduced.attributes.insert(key.clone(), value.clone());
        }
    }
    reduced
}

/// Serialiseert een graph naar een GEXF 1.2-document.
pub fn write_str<G: GexfGraph>(graph: &G) -> WriteResult<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("gexf");
    root.push_attribute(("version", "1.2"));
    root.push_attribute(("xmlns", GEXF_NAMESPACE));
    root.push_attribute(("xmlns:viz", VIZ_NAMESPACE));
    root.push_attribute(("xmlns:xsi", XSI_NAMESPACE));
    root.push_attribute(("xsi:schemaLocation", SCHEMA_LOCATION));
    writer.write_event(Event::Start(root))?;

    write_meta(&mut writer, graph.attributes())?;

    let node_keys = graph.nodes();
    let edge_keys = graph.edges();
    log::debug!(
        "wegschrijven van {} nodes en {} edges",
        node_keys.len(),
        edge_keys.len()
    );

    let nodes: Vec<(&str, Reduced)> = node_keys
        .into_iter()
        .map(|key| (key, reduce(graph.node_attributes(key))))
        .collect();
    let edges: Vec<(&str, Reduced)> = edge_keys
        .into_iter()
        .map(|key| (key, reduce(graph.edge_attributes(key))))
        .collect();

    let node_model = infer_model(nodes.iter().map(|(_, reduced)| &reduced.attributes));
    let edge_model = infer_model(edges.iter().map(|(_, reduced)| &reduced.attributes));

    let default_edge_type = resolve_default_edge_type(graph, &edges);
    let mut graph_el = BytesStart::new("graph");
    graph_el.push_attribute(("defaultedgetype", default_edge_type.tag()));
    writer.write_event(Event::Start(graph_el))?;

    write_model(&mut writer, "node", &node_model)?;
    write_model(&mut writer, "edge", &edge_model)?;

    writer.write_event(Event::Start(BytesStart::new("nodes")))?;
    for (key, reduced) in &nodes {
        write_node(&mut writer, key, reduced, &node_model)?;
    }
    writer.write_event(Event::End(BytesEnd::new("nodes")))?;

    writer.write_event(Event::Start(BytesStart::new("edges")))?;
    for (key, reduced) in &edges {
        write_edge(&mut writer, graph, key, reduced, &edge_model, default_edge_type)?;
    }
    writer.write_event(Event::End(BytesEnd::new("edges")))?;

    writer.write_event(Event::End(BytesEnd::new("graph")))?;
    writer.write_event(Event::End(BytesEnd::new("gexf")))?;

    Ok(String::from_utf8(writer.into_inner())?)
}

/// Graph-attributen worden meta-kindelementen; alleen
/// `lastModifiedDate` wordt een attribuut op het meta-element zelf.
fn write_meta<W: Write>(writer: &mut Writer<W>, attributes: &AttrMap) -> WriteResult<()> {
    let mut meta = BytesStart::new("meta");
    if let Some(date) = attributes.get("lastModifiedDate") {
        let text = cast_to_text(date);
        meta.push_attribute(("lastmodifieddate", text.as_str()));
    }

    let children: Vec<(&String, &AttrValue)> = attributes
        .iter()
        .filter(|(key, _)| key.as_str() != "lastModifiedDate")
        .collect();

    if children.is_empty() {
        writer.write_event(Event::Empty(meta))?;
        return Ok(());
    }

    writer.write_event(Event::Start(meta))?;
    for (key, value) in children {
        let text = cast_to_text(value);
        writer.write_event(Event::Start(BytesStart::new(key.as_str())))?;
        writer.write_event(Event::Text(BytesText::new(&text)))?;
        writer.write_event(Event::End(BytesEnd::new(key.as_str())))?;
    }
    writer.write_event(Event::End(BytesEnd::new("meta")))?;
    Ok(())
}

fn write_model<W: Write>(
    writer: &mut Writer<W>,
    class: &str,
    model: &AttributeModel,
) -> WriteResult<()> {
    if model.is_empty() {
        return Ok(());
    }
    let mut block = BytesStart::new("attributes");
    block.push_attribute(("class", class));
    writer.write_event(Event::Start(block))?;
    for field in model.fields() {
        let mut el = BytesStart::new("attribute");
        el.push_attribute(("id", field.id.as_str()));
        el.push_attribute(("title", field.title.as_str()));
        el.push_attribute(("type", field.ty.tag()));
        writer.write_event(Event::Empty(el))?;
    }
    writer.write_event(Event::End(BytesEnd::new("attributes")))?;
    Ok(())
}

fn write_node<W: Write>(
    writer: &mut Writer<W>,
    key: &str,
    reduced: &Reduced,
    model: &AttributeModel,
) -> WriteResult<()> {
    let mut el = BytesStart::new("node");
    el.push_attribute(("id", key));
    if let Some(label) = &reduced.label {
        el.push_attribute(("label", label.as_str()));
    }

    let values = modelled_values(reduced, model);
    if values.is_empty() {
        writer.write_event(Event::Empty(el))?;
    } else {
        writer.write_event(Event::Start(el))?;
        write_attvalues(writer, &values)?;
        writer.write_event(Event::End(BytesEnd::new("node")))?;
    }
    Ok(())
}

fn write_edge<W: Write, G: GexfGraph>(
    writer: &mut Writer<W>,
    graph: &G,
    key: &str,
    reduced: &Reduced,
    model: &AttributeModel,
    default_edge_type: EdgeType,
) -> WriteResult<()> {
    let mut el = BytesStart::new("edge");
    el.push_attribute(("id", key));
    if let Some(source) = graph.source(key) {
        el.push_attribute(("source", source));
    }
    if let Some(target) = graph.target(key) {
        el.push_attribute(("target", target));
    }
    let edge_type = match graph.is_directed(key) {
        Some(false) => EdgeType::Undirected,
        _ => EdgeType::Directed,
    };
    if edge_type != default_edge_type {
        el.push_attribute(("type", edge_type.tag()));
    }
    if let Some(label) = &reduced.label {
        el.push_attribute(("label", label.as_str()));
    }

    let values = modelled_values(reduced, model);
    if values.is_empty() {
        writer.write_event(Event::Empty(el))?;
    } else {
        writer.write_event(Event::Start(el))?;
        write_attvalues(writer, &values)?;
        writer.write_event(Event::End(BytesEnd::new("edge")))?;
    }
    Ok(())
}

/// Alleen de sleutels die zowel in het model als op het element zelf
/// voorkomen worden uitgeschreven.
fn modelled_values<'a>(
    reduced: &'a Reduced,
    model: &AttributeModel,
) -> Vec<(&'a str, &'a AttrValue)> {
    reduced
        .attributes
        .iter()
        .filter(|(key, _)| model.field(key).is_some())
        .map(|(key, value)| (key.as_str(), value))
        .collect()
}

fn write_attvalues<W: Write>(
    writer: &mut Writer<W>,
    values: &[(&str, &AttrValue)],
) -> WriteResult<()> {
    writer.write_event(Event::Start(BytesStart::new("attvalues")))?;
    for (key, value) in values {
        let mut el = BytesStart::new("attvalue");
        el.push_attribute(("for", *key));
        let text = cast_to_text(value);
        el.push_attribute(("value", text.as_str()));
        writer.write_event(Event::Empty(el))?;
    }
    writer.write_event(Event::End(BytesEnd::new("attvalues")))?;
    Ok(())
}

fn resolve_default_edge_type<G: GexfGraph>(graph: &G, edges: &[(&str, Reduced)]) -> EdgeType {
    if edges.is_empty() {
        return graph.edge_type();
    }
    if edges
        .iter()
        .all(|(key, _)| graph.is_directed(key) == Some(false))
    {
        EdgeType::Undirected
    } else {
        EdgeType::Directed
    }
}
