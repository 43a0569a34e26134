//! Leespad: de in-memory documentparser en de streamingvariant.

pub mod gexf_xml;
pub mod sax;
