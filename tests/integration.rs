use gexf_engine::{AttrMap, AttrValue, GexfGraph, Graph, SaxParser, parse_str, write_str};

#[test]
fn parses_minimal_hello_world() {
    let xml = include_str!("resources/minimal.gexf");
    let graph: Graph = parse_str(xml).expect("minimal graph geparsed");

    assert_eq!(graph.order(), 2);
    assert_eq!(graph.size(), 1);

    let mut expected_meta = AttrMap::new();
    expected_meta.insert("lastModifiedDate".to_owned(), AttrValue::from("2009-03-20"));
    expected_meta.insert("creator".to_owned(), AttrValue::from("Gexf.net"));
    expected_meta.insert(
        "description".to_owned(),
        AttrValue::from("A hello world! file"),
    );
    assert_eq!(graph.attributes(), &expected_meta);

    let hello = graph.node_attributes("0").expect("node 0 aanwezig");
    assert_eq!(hello.get("label"), Some(&AttrValue::from("Hello")));

    let edge = graph.edges()[0].to_owned();
    assert_eq!(graph.source(&edge), Some("0"));
    assert_eq!(graph.target(&edge), Some("1"));
    assert_eq!(graph.is_directed(&edge), Some(true));
    assert!((graph.edge_weight(&edge) - 1.0).abs() < f64::EPSILON);
}

#[test]
fn parses_data_graph_with_defaults() {
    let xml = include_str!("resources/data.gexf");
    let graph: Graph = parse_str(xml).expect("data graph geparsed");

    assert_eq!(graph.order(), 4);
    assert_eq!(graph.size(), 5);

    let webatlas = graph.node_attributes("1").expect("node 1 aanwezig");
    assert_eq!(webatlas.get("label"), Some(&AttrValue::from("Webatlas")));
    assert_eq!(
        webatlas.get("url"),
        Some(&AttrValue::from("http://webatlas.fr"))
    );
    assert_eq!(webatlas.get("indegree"), Some(&AttrValue::Float(2.0)));
    // default uit het model, geen expliciete attvalue
    assert_eq!(webatlas.get("frog"), Some(&AttrValue::Boolean(true)));

    // expliciete attvalue overschrijft de default
    let barabasi = graph.node_attributes("3").expect("node 3 aanwezig");
    assert_eq!(barabasi.get("frog"), Some(&AttrValue::Boolean(false)));
}

#[test]
fn parses_liststring_values() {
    let xml = include_str!("resources/liststring.gexf");
    let graph: Graph = parse_str(xml).expect("liststring graph geparsed");

    let gephi = graph.node_attributes("0").expect("node 0 aanwezig");
    assert_eq!(
        gephi.get("types"),
        Some(&AttrValue::List(vec![
            "cooking".to_owned(),
            "money".to_owned()
        ]))
    );

    // lege tekst parset naar een lege lijst
    let webatlas = graph.node_attributes("1").expect("node 1 aanwezig");
    assert_eq!(webatlas.get("types"), Some(&AttrValue::List(Vec::new())));
}

#[test]
fn streaming_parse_matches_in_memory_parse() {
    let xml = include_str!("resources/minimal.gexf");
    let reference: Graph = parse_str(xml).expect("minimal graph geparsed");

    let mut errors = Vec::new();
    let mut parser: SaxParser<Graph, _> = SaxParser::open(|err| errors.push(err));
    // kleine chunks zodat tags over chunkgrenzen heen breken
    for chunk in xml.as_bytes().chunks(7) {
        parser.write(std::str::from_utf8(chunk).expect("ascii fixture"));
    }
    let streamed = parser.close().expect("graph aanwezig");

    assert!(errors.is_empty(), "onverwachte fouten: {errors:?}");
    assert_eq!(streamed.order(), reference.order());
    assert_eq!(streamed.size(), reference.size());
    assert_eq!(streamed.attributes(), reference.attributes());
    assert_eq!(streamed.node_attributes("0"), reference.node_attributes("0"));
    assert_eq!(streamed.is_directed("0"), reference.is_directed("0"));
}

#[test]
fn written_document_parses_back() {
    let mut graph = Graph::new();
    graph.set_attribute("lastModifiedDate", AttrValue::from("2105-12-23"));
    graph.set_attribute("author", AttrValue::from("Yomguithereal"));
    graph.set_attribute("title", AttrValue::from("Basic Graph"));

    let mut suzy = AttrMap::new();
    suzy.insert("label".to_owned(), AttrValue::from("Suzy, Ghost"));
    suzy.insert("male".to_owned(), AttrValue::Boolean(false));
    suzy.insert("age".to_owned(), AttrValue::Integer(22));
    suzy.insert("surname".to_owned(), AttrValue::from("Ghost"));
    suzy.insert("mixed".to_owned(), AttrValue::Integer(45));
    graph.add_node("Suzy", suzy).unwrap();

    let mut john = AttrMap::new();
    john.insert("label".to_owned(), AttrValue::from("John, Appleseed"));
    john.insert("male".to_owned(), AttrValue::Boolean(true));
    john.insert("age".to_owned(), AttrValue::Integer(34));
    john.insert("surname".to_owned(), AttrValue::from("Appleseed"));
    john.insert("mixed".to_owned(), AttrValue::from("hello"));
    graph.add_node("John", john).unwrap();

    let mut edge = AttrMap::new();
    edge.insert("weight".to_owned(), AttrValue::Integer(456));
    graph
        .add_directed_edge_with_key("J-S", "John", "Suzy", edge)
        .unwrap();

    let output = write_str(&graph).expect("document geschreven");
    let parsed: Graph = parse_str(&output).expect("uitvoer parset terug");

    assert_eq!(parsed.order(), 2);
    assert_eq!(parsed.size(), 1);
    assert_eq!(
        parsed.attributes().get("author"),
        Some(&AttrValue::from("Yomguithereal"))
    );
    assert_eq!(
        parsed.attributes().get("lastModifiedDate"),
        Some(&AttrValue::from("2105-12-23"))
    );

    let suzy = parsed.node_attributes("Suzy").expect("Suzy aanwezig");
    assert_eq!(suzy.get("label"), Some(&AttrValue::from("Suzy, Ghost")));
    assert_eq!(suzy.get("male"), Some(&AttrValue::Boolean(false)));
    assert_eq!(suzy.get("age"), Some(&AttrValue::Integer(22)));
    // het conflicterende veld is naar string verbreed en komt als tekst terug
    assert_eq!(suzy.get("mixed"), Some(&AttrValue::from("45")));

    let john = parsed.node_attributes("John").expect("John aanwezig");
    assert_eq!(john.get("mixed"), Some(&AttrValue::from("hello")));

    assert_eq!(parsed.source("J-S"), Some("John"));
    assert_eq!(parsed.target("J-S"), Some("Suzy"));
    assert!((parsed.edge_weight("J-S") - 456.0).abs() < f64::EPSILON);
}

#[test]
fn writer_and_parser_are_not_inverse_for_viz_fields() {
    let mut graph = Graph::new();
    let mut node = AttrMap::new();
    node.insert("x".to_owned(), AttrValue::Double(1.5));
    node.insert("name".to_owned(), AttrValue::from("a"));
    graph.add_node("a", node).unwrap();

    let output = write_str(&graph).expect("document geschreven");
    let parsed: Graph = parse_str(&output).expect("uitvoer parset terug");

    let attributes = parsed.node_attributes("a").expect("node aanwezig");
    // het viz-veld is onderweg verdwenen, het gewone attribuut niet
    assert_eq!(attributes.get("x"), None);
    assert_eq!(attributes.get("name"), Some(&AttrValue::from("a")));
}
