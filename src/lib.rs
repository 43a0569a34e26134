#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod graph;
pub mod model;
pub mod parse;
pub mod write;

pub use graph::value::{AttrMap, AttrValue};
pub use graph::{EdgeType, GexfGraph, Graph, GraphError, GraphOptions};
pub use parse::gexf_xml::{GexfDocument, ParseError, parse_document, parse_str};
pub use parse::sax::SaxParser;
pub use write::gexf_xml::{WriteError, write_str};
