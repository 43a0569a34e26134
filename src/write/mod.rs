//! Schrijfpad: serialisatie van een graph naar een GEXF-document.

pub mod gexf_xml;
