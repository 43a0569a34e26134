//! Streaming (SAX-stijl) GEXF-parser.
//!
//! Dezelfde beslissingen als [`super::gexf_xml`], maar de toestand
//! (huidig model, huidige defaults, element-in-opbouw) wordt
//! incrementeel meegedragen over een open/write/close-levenscyclus in
//! plaats van over één in-memory document. Fouten worden via de
//! error-callback gemeld, niet geworpen: de chunk die een fout
//! veroorzaakt kan ver verwijderd zijn van de aanroep die haar aan het
//! licht brengt.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::graph::value::{AttrMap, AttrValue};
use crate::graph::{EdgeType, GexfGraph, GraphOptions};
use crate::model::cast::cast_from_text;
use crate::model::{AttributeModel, FieldDecl, ModelError, extract_model};
use crate::parse::gexf_xml::ParseError;

/// Parserfase: vóór of na het openen van het `graph`-element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitingGraph,
    InGraph,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrClass {
    Node,
    Edge,
}

#[derive(Debug)]
enum PendingElement {
    Node {
        id: String,
        attributes: AttrMap,
    },
    Edge {
        id: Option<String>,
        ty: Option<String>,
        source: String,
        target: String,
        attributes: AttrMap,
    },
}

#[derive(Debug)]
enum Token {
    Text(String),
    Markup(String),
}

/// Incrementele parser over een chunk-feed.
///
/// Eén instantie is aan één feed gebonden en niet geschikt voor
/// gelijktijdig gebruik: de toestandstransities zijn geordend en niet
/// idempotent. [`SaxParser::close`] consumeert de handle, waarna verdere
/// writes ook niet meer uit te drukken zijn.
pub struct SaxParser<G: GexfGraph, F: FnMut(ParseError)> {
    on_error: F,
    buffer: String,
    phase: Phase,
    default_edge_type: EdgeType,
    graph: Option<G>,
    // metadata die vóór het graph-element binnenkomt
    pending_meta: Vec<(String, AttrValue)>,
    in_meta: bool,
    meta_capture: Option<(String, String)>,
    // modelopbouw
    current_class: Option<AttrClass>,
    pending_decls: Vec<FieldDecl>,
    current_decl: Option<FieldDecl>,
    default_capture: Option<String>,
    node_model: AttributeModel,
    node_defaults: AttrMap,
    edge_model: AttributeModel,
    edge_defaults: AttrMap,
    current_element: Option<PendingElement>,
}

impl<G, F> SaxParser<G, F>
where
    G: GexfGraph,
    F: FnMut(ParseError),
{
    /// Bind de parser aan een foutcallback en begin met een lege feed.
    pub fn open(on_error: F) -> Self {
        Self {
            on_error,
            buffer: String::new(),
            phase: Phase::AwaitingGraph,
            default_edge_type: EdgeType::Directed,
            graph: None,
            pending_meta: Vec::new(),
            in_meta: false,
            meta_capture: None,
            current_class: None,
            pending_decls: Vec::new(),
            current_decl: None,
            default_capture: None,
            node_model: AttributeModel::new(),
            node_defaults: AttrMap::new(),
            edge_model: AttributeModel::new(),
            edge_defaults: AttrMap::new(),
            current_element: None,
        }
    }

    /// Voer een chunk aan. Alle volledige XML-tokens in de buffer worden
    /// direct verwerkt; graphmutaties gebeuren synchroon voordat deze
    /// aanroep terugkeert. Een chunkgrens mag midden in een tag of
    /// tekstnode vallen.
    pub fn write(&mut self, chunk: &str) {
        self.buffer.push_str(chunk);
        self.drain();
    }

    /// Sluit de feed af en lever de graph op, als het `graph`-element
    /// ooit gezien is. Een onvolledig token aan het einde wordt als fout
    /// gemeld.
    pub fn close(mut self) -> Option<G> {
        self.drain();
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            if rest.starts_with('<') {
                (self.on_error)(ParseError::Syntax(
                    "onvolledige XML aan het einde van de stream".to_owned(),
                ));
            } else if !rest.trim().is_empty() {
                (self.on_error)(ParseError::Syntax(
                    "losse tekst aan het einde van de stream".to_owned(),
                ));
            }
        }
        self.graph
    }

    fn drain(&mut self) {
        while let Some(token) = self.take_token() {
            if let Err(err) = self.handle_token(&token) {
                (self.on_error)(err);
            }
        }
    }

    /// Knip het eerstvolgende volledige token van de buffer af; `None`
    /// zolang het token nog niet compleet binnen is.
    fn take_token(&mut self) -> Option<Token> {
        if self.buffer.is_empty() {
            return None;
        }
        if self.buffer.starts_with('<') {
            let end = find_markup_end(&self.buffer)?;
            Some(Token::Markup(self.buffer.drain(..end).collect()))
        } else {
            let end = self.buffer.find('<')?;
            Some(Token::Text(self.buffer.drain(..end).collect()))
        }
    }

    fn handle_token(&mut self, token: &Token) -> Result<(), ParseError> {
        match token {
            Token::Text(raw) => {
                let text = quick_xml::escape::unescape(raw)
                    .map_err(|err| ParseError::Syntax(err.to_string()))?;
                self.handle_text(&text);
                Ok(())
            }
            Token::Markup(markup) => self.handle_markup(markup),
        }
    }

    fn handle_markup(&mut self, markup: &str) -> Result<(), ParseError> {
        let mut reader = Reader::from_str(markup);
        reader.check_end_names(false);

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    let (name, attrs) = decompose(&start)?;
                    self.handle_open(&name, &attrs)?;
                }
                Event::Empty(start) => {
                    let (name, attrs) = decompose(&start)?;
                    self.handle_open(&name, &attrs)?;
                    self.handle_close(&name)?;
                }
                Event::End(end) => {
                    let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                    self.handle_close(&name)?;
                }
                Event::CData(data) => {
                    let text = String::from_utf8_lossy(data.as_ref()).into_owned();
                    self.handle_text(&text);
                }
                Event::Eof => return Ok(()),
                // declaratie, commentaar, PI, doctype
                _ => {}
            }
        }
    }

    fn handle_text(&mut self, text: &str) {
        if let Some(capture) = self.default_capture.as_mut() {
            capture.push_str(text);
        } else if let Some((_, capture)) = self.meta_capture.as_mut() {
            capture.push_str(text);
        }
    }

    fn handle_open(
        &mut self,
        name: &str,
        attrs: &HashMap<String, String>,
    ) -> Result<(), ParseError> {
        match self.phase {
            Phase::AwaitingGraph => match name {
                "graph" => {
                    if let Some(tag) = attrs.get("defaultedgetype") {
                        self.default_edge_type = EdgeType::from_tag(tag);
                    }
                    log::debug!(
                        "graph-element geopend, standaardrichting {}",
                        self.default_edge_type.tag()
                    );
                    let mut graph = G::construct(GraphOptions {
                        edge_type: self.default_edge_type,
                        ..GraphOptions::default()
                    });
                    for (key, value) in self.pending_meta.drain(..) {
                        graph.set_attribute(&key, value);
                    }
                    self.graph = Some(graph);
                    self.phase = Phase::InGraph;
                }
                "meta" => {
                    self.in_meta = true;
                    if let Some(date) = attrs.get("lastmodifieddate") {
                        self.pending_meta
                            .push(("lastModifiedDate".to_owned(), AttrValue::from(date.as_str())));
                    }
                }
                _ if self.in_meta && is_meta_child(name) => {
                    self.meta_capture = Some((name.to_owned(), String::new()));
                }
                _ => {}
            },
            Phase::InGraph => match name {
                "attributes" => {
                    self.current_class = match attrs.get("class").map(String::as_str) {
                        Some("node") => Some(AttrClass::Node),
                        Some("edge") => Some(AttrClass::Edge),
                        _ => None,
                    };
                    self.pending_decls.clear();
                }
                "attribute" if self.current_class.is_some() => {
                    self.current_decl = Some(FieldDecl {
                        id: attrs.get("id").cloned(),
                        for_id: attrs.get("for").cloned(),
                        ty: attrs.get("type").cloned(),
                        title: attrs.get("title").cloned(),
                        default: None,
                    });
                }
                "default" if self.current_decl.is_some() => {
                    self.default_capture = Some(String::new());
                }
                "node" => {
                    let Some(id) = attrs.get("id") else {
                        return Err(ParseError::Syntax("node zonder id".to_owned()));
                    };
                    let mut attributes = AttrMap::new();
                    if let Some(label) = attrs.get("label") {
                        if !label.is_empty() {
                            attributes
                                .insert("label".to_owned(), AttrValue::from(label.as_str()));
                        }
                    }
                    self.current_element = Some(PendingElement::Node {
                        id: id.clone(),
                        attributes,
                    });
                }
                "edge" => {
                    let (Some(source), Some(target)) = (attrs.get("source"), attrs.get("target"))
                    else {
                        return Err(ParseError::Syntax("edge zonder source of target".to_owned()));
                    };
                    let mut attributes = AttrMap::new();
                    if let Some(label) = attrs.get("label") {
                        if !label.is_empty() {
                            attributes
                                .insert("label".to_owned(), AttrValue::from(label.as_str()));
                        }
                    }
                    self.current_element = Some(PendingElement::Edge {
                        id: attrs.get("id").cloned(),
                        ty: attrs.get("type").cloned(),
                        source: source.clone(),
                        target: target.clone(),
                        attributes,
                    });
                }
                "attvalue" => self.handle_attvalue(attrs)?,
                _ => {}
            },
        }
        Ok(())
    }

    fn handle_attvalue(&mut self, attrs: &HashMap<String, String>) -> Result<(), ParseError> {
        let is_node = match self.current_element.as_ref() {
            // element al verworpen na een eerdere fout
            None => return Ok(()),
            Some(PendingElement::Node { .. }) => true,
            Some(PendingElement::Edge { .. }) => false,
        };

        let Some(id) = attrs.get("id").or_else(|| attrs.get("for")) else {
            self.current_element = None;
            return Err(ModelError::MissingId.into());
        };

        let model = if is_node {
            &self.node_model
        } else {
            &self.edge_model
        };
        let Some(field) = model.field(id) else {
            self.current_element = None;
            return Err(ModelError::UnknownField(id.clone()).into());
        };
        let title = field.title.clone();
        let ty = field.ty;
        let value = attrs.get("value").map_or("", String::as_str);

        if let Some(
            PendingElement::Node { attributes, .. } | PendingElement::Edge { attributes, .. },
        ) = self.current_element.as_mut()
        {
            attributes.insert(title, cast_from_text(ty, value));
        }
        Ok(())
    }

    fn handle_close(&mut self, name: &str) -> Result<(), ParseError> {
        match name {
            "attribute" => {
                if let Some(decl) = self.current_decl.take() {
                    self.pending_decls.push(decl);
                }
            }
            "default" => {
                if let Some(text) = self.default_capture.take() {
                    if let Some(decl) = self.current_decl.as_mut() {
                        decl.default = Some(text);
                    }
                }
            }
            "attributes" => {
                let decls = std::mem::take(&mut self.pending_decls);
                match self.current_class.take() {
                    Some(AttrClass::Node) => {
                        let (model, defaults) = extract_model(&decls)?;
                        self.node_model = model;
                        self.node_defaults = defaults;
                    }
                    Some(AttrClass::Edge) => {
                        let (model, defaults) = extract_model(&decls)?;
                        self.edge_model = model;
                        self.edge_defaults = defaults;
                    }
                    None => {}
                }
            }
            "node" => {
                if let Some(PendingElement::Node { id, attributes }) = self.current_element.take()
                {
                    self.finish_node(&id, attributes)?;
                }
            }
            "edge" => {
                if let Some(PendingElement::Edge {
                    id,
                    ty,
                    source,
                    target,
                    attributes,
                }) = self.current_element.take()
                {
                    self.finish_edge(id, ty.as_deref(), &source, &target, attributes)?;
                }
            }
            "meta" => {
                self.in_meta = false;
            }
            _ => {
                if let Some((key, text)) = self.meta_capture.take() {
                    if key == name {
                        self.push_meta(key, text);
                    } else {
                        self.meta_capture = Some((key, text));
                    }
                }
            }
        }
        Ok(())
    }

    fn push_meta(&mut self, key: String, text: String) {
        let value = AttrValue::Text(text);
        if let Some(graph) = self.graph.as_mut() {
            graph.set_attribute(&key, value);
        } else {
            self.pending_meta.push((key, value));
        }
    }

    fn finish_node(&mut self, id: &str, attributes: AttrMap) -> Result<(), ParseError> {
        let merged = merge_defaults(&self.node_defaults, attributes);
        let Some(graph) = self.graph.as_mut() else {
            return Err(ParseError::Syntax("node buiten <graph>".to_owned()));
        };
        graph.add_node(id, merged)?;
        Ok(())
    }

    fn finish_edge(
        &mut self,
        id: Option<String>,
        ty: Option<&str>,
        source: &str,
        target: &str,
        attributes: AttrMap,
    ) -> Result<(), ParseError> {
        let merged = merge_defaults(&self.edge_defaults, attributes);
        let edge_type = ty.map_or(self.default_edge_type, EdgeType::from_tag);
        let Some(graph) = self.graph.as_mut() else {
            return Err(ParseError::Syntax("edge buiten <graph>".to_owned()));
        };

        match (id, edge_type) {
            (Some(id), EdgeType::Directed) => {
                graph.add_directed_edge_with_key(&id, source, target, merged)?;
            }
            (Some(id), EdgeType::Undirected) => {
                graph.add_undirected_edge_with_key(&id, source, target, merged)?;
            }
            (None, EdgeType::Directed) => {
                graph.add_directed_edge(source, target, merged)?;
            }
            (None, EdgeType::Undirected) => {
                graph.add_undirected_edge(source, target, merged)?;
            }
        }
        Ok(())
    }
}

fn merge_defaults(defaults: &AttrMap, attributes: AttrMap) -> AttrMap {
    if defaults.is_empty() {
        return attributes;
    }
    let mut merged = defaults.clone();
    merged.extend(attributes);
    merged
}

fn is_meta_child(name: &str) -> bool {
    matches!(name, "creator" | "keywords" | "description" | "title")
}

fn decompose(start: &BytesStart<'_>) -> Result<(String, HashMap<String, String>), ParseError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attrs = HashMap::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.insert(key, value);
    }
    Ok((name, attrs))
}

/// Zoekt het einde (exclusief) van het markup-token aan het begin van de
/// buffer. `None` betekent: nog niet volledig binnen.
fn find_markup_end(buffer: &str) -> Option<usize> {
    for (prefix, terminator) in [("<!--", "-->"), ("<![CDATA[", "]]>"), ("<?", "?>")] {
        if buffer.starts_with(prefix) {
            return buffer[prefix.len()..]
                .find(terminator)
                .map(|idx| prefix.len() + idx + terminator.len());
        }
        // een korte buffer kan nog tot dit prefix uitgroeien
        if prefix.starts_with(buffer) {
            return None;
        }
    }

    // gewone tag: de eerste '>' buiten aanhalingstekens
    let mut quote: Option<u8> = None;
    for (idx, byte) in buffer.bytes().enumerate() {
        match (quote, byte) {
            (None, b'"' | b'\'') => quote = Some(byte),
            (Some(open), _) if byte == open => quote = None,
            (None, b'>') => return Some(idx + 1),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::SaxParser;
    use crate::graph::value::AttrValue;
    use crate::graph::{GexfGraph, Graph};
    use crate::model::ModelError;
    use crate::parse::gexf_xml::ParseError;

    #[test]
    fn graph_tag_split_over_chunks_still_instantiates() {
        let mut errors = Vec::new();
        let mut parser: SaxParser<Graph, _> = SaxParser::open(|err| errors.push(err));

        parser.write("<gexf version=\"1.2\"><gra");
        parser.write("ph defaultedgetype=\"undirec");
        parser.write("ted\"><nodes><node id=\"a\"/><node id=\"b\"/></nodes>");
        parser.write("<edges><edge id=\"0\" source=\"a\" target=\"b\"/></edges>");
        parser.write("</graph></gexf>");

        let graph = parser.close().expect("graph aanwezig");
        assert!(errors.is_empty(), "onverwachte fouten: {errors:?}");
        assert_eq!(graph.order(), 2);
        assert_eq!(graph.size(), 1);
        assert_eq!(graph.is_directed("0"), Some(false));
    }

    #[test]
    fn models_and_defaults_apply_incrementally() {
        let mut errors = Vec::new();
        let mut parser: SaxParser<Graph, _> = SaxParser::open(|err| errors.push(err));

        parser.write(
            "<gexf version=\"1.2\"><meta lastmodifieddate=\"2009-03-20\">\
             <creator>Gexf.net</creator></meta><graph defaultedgetype=\"directed\">",
        );
        parser.write(
            "<attributes class=\"node\">\
             <attribute id=\"0\" title=\"url\" type=\"string\"/>\
             <attribute id=\"2\" title=\"frog\" type=\"boolean\"><default>true</default></attribute>\
             </attributes>",
        );
        parser.write("<nodes><node id=\"0\" label=\"Gephi\"><attvalues>");
        parser.write("<attvalue for=\"0\" value=\"http://gephi.org\"/>");
        parser.write("</attvalues></node><node id=\"1\"/></nodes>");
        parser.write("</graph></gexf>");

        let graph = parser.close().expect("graph aanwezig");
        assert!(errors.is_empty(), "onverwachte fouten: {errors:?}");

        assert_eq!(
            graph.attributes().get("creator"),
            Some(&AttrValue::from("Gexf.net"))
        );
        assert_eq!(
            graph.attributes().get("lastModifiedDate"),
            Some(&AttrValue::from("2009-03-20"))
        );

        let node = graph.node_attributes("0").unwrap();
        assert_eq!(node.get("label"), Some(&AttrValue::from("Gephi")));
        assert_eq!(node.get("url"), Some(&AttrValue::from("http://gephi.org")));
        assert_eq!(node.get("frog"), Some(&AttrValue::Boolean(true)));

        // default geldt ook voor een node zonder attvalues
        let bare = graph.node_attributes("1").unwrap();
        assert_eq!(bare.get("frog"), Some(&AttrValue::Boolean(true)));
    }

    #[test]
    fn unknown_field_reaches_the_callback_and_drops_the_element() {
        let mut errors = Vec::new();
        let mut parser: SaxParser<Graph, _> = SaxParser::open(|err| errors.push(err));

        parser.write(
            "<gexf><graph><nodes>\
             <node id=\"a\"><attvalues><attvalue for=\"X\" value=\"boe\"/></attvalues></node>\
             <node id=\"b\"/>\
             </nodes></graph></gexf>",
        );

        let graph = parser.close().expect("graph aanwezig");
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            ParseError::Model(ModelError::UnknownField(id)) if id == "X"
        ));
        // het element met de foute verwijzing is verworpen, de rest niet
        assert_eq!(graph.order(), 1);
        assert!(graph.node_attributes("b").is_some());
    }

    #[test]
    fn truncated_stream_reports_an_error_on_close() {
        let mut errors = Vec::new();
        let mut parser: SaxParser<Graph, _> = SaxParser::open(|err| errors.push(err));

        parser.write("<gexf><graph><nodes><node id=\"a\"");

        let graph = parser.close();
        assert!(graph.is_some(), "graph was al geïnstantieerd");
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], ParseError::Syntax(_)));
    }

    #[test]
    fn stream_without_graph_yields_none() {
        let mut errors = Vec::new();
        let parser: SaxParser<Graph, _> = SaxParser::open(|err| errors.push(err));
        assert!(parser.close().is_none());
        assert!(errors.is_empty());
    }

    #[test]
    fn mutual_default_edge_type_streams_as_undirected() {
        let mut errors = Vec::new();
        let mut parser: SaxParser<Graph, _> = SaxParser::open(|err| errors.push(err));

        parser.write("<gexf><graph defaultedgetype=\"mutual\"><nodes>");
        parser.write("<node id=\"a\"/><node id=\"b\"/></nodes><edges>");
        parser.write("<edge id=\"0\" source=\"a\" target=\"b\"/></edges></graph></gexf>");

        let graph = parser.close().expect("graph aanwezig");
        assert!(errors.is_empty());
        assert_eq!(graph.is_directed("0"), Some(false));
    }
}
