// tests/conversion_graph.rs

use std::collections::HashSet;

use convcache::config::FormatConfig;
use convcache::convert::{ConversionGraph, Formats};
use proptest::prelude::*;

fn chain_graph() -> ConversionGraph {
    let mut g = ConversionGraph::new();
    g.add_edge("eps", "pdf", "epstopdf $$i $$o");
    g.add_edge("pdf", "ppm", "pdftoppm $$i $$o");
    g.add_edge("ps", "pdf", "ps2pdf $$i $$o");
    g.add_edge("eps", "ps", "eps2ps $$i $$o");
    g
}

fn formats(list: &[(&str, bool)]) -> Formats {
    let cfg: Vec<_> = list
        .iter()
        .map(|(name, loadable)| FormatConfig::new(name, name, *loadable))
        .collect();
    Formats::from_config(&cfg)
}

#[test]
fn shortest_path_by_edge_count() {
    let g = chain_graph();
    let path = g.get_path("eps", "ppm");
    let hops: Vec<_> = path.iter().map(|e| (e.from.as_str(), e.to.as_str())).collect();
    assert_eq!(hops, [("eps", "pdf"), ("pdf", "ppm")]);
    assert_eq!(path.edges()[1].command, "pdftoppm $$i $$o");
}

#[test]
fn unreachable_and_identity_paths_are_empty() {
    let g = chain_graph();
    assert!(g.get_path("ppm", "eps").is_empty());
    assert!(g.get_path("eps", "unknown").is_empty());
    assert!(g.get_path("eps", "eps").is_empty());

    assert!(g.is_reachable("eps", "eps"));
    assert!(g.is_reachable("ps", "ppm"));
    assert!(!g.is_reachable("ppm", "pdf"));
}

#[test]
fn re_adding_an_edge_replaces_its_command() {
    let mut g = chain_graph();
    g.add_edge("eps", "pdf", "gs $$i $$o");
    let path = g.get_path("eps", "pdf");
    assert_eq!(path.len(), 1);
    assert_eq!(path.edges()[0].command, "gs $$i $$o");
    assert_eq!(g.edges().len(), 4);
}

#[test]
fn nearest_loadable_prefers_self_then_distance_then_registry_order() {
    let mut g = ConversionGraph::new();
    g.add_edge("svg", "png", "a");
    g.add_edge("svg", "ppm", "b");
    g.add_edge("eps", "pdf", "c");
    g.add_edge("pdf", "png", "d");
    g.add_edge("eps", "gif", "e");

    let fmts = formats(&[
        ("ppm", true),
        ("png", true),
        ("gif", true),
        ("svg", false),
        ("eps", false),
        ("pdf", false),
    ]);

    assert_eq!(g.nearest_loadable("png", &fmts).unwrap().name, "png");
    // png and ppm are both one hop away: ppm is listed first.
    assert_eq!(g.nearest_loadable("svg", &fmts).unwrap().name, "ppm");
    // gif is one hop, png two.
    assert_eq!(g.nearest_loadable("eps", &fmts).unwrap().name, "gif");
    assert!(g.nearest_loadable("unknown", &fmts).is_none());
}

fn edge_list() -> impl Strategy<Value = Vec<(usize, usize)>> {
    proptest::collection::vec((0..6usize, 0..6usize), 0..20)
}

proptest! {
    #[test]
    fn paths_are_contiguous_and_acyclic(edges in edge_list(), from in 0..6usize, to in 0..6usize) {
        let mut g = ConversionGraph::new();
        for (a, b) in &edges {
            if a != b {
                g.add_edge(&format!("f{a}"), &format!("f{b}"), "cmd");
            }
        }
        let (from, to) = (format!("f{from}"), format!("f{to}"));
        let path = g.get_path(&from, &to);

        if path.is_empty() {
            prop_assert!(from == to || !g.is_reachable(&from, &to));
        } else {
            prop_assert_eq!(&path.edges()[0].from, &from);
            prop_assert_eq!(&path.edges()[path.len() - 1].to, &to);
            for pair in path.edges().windows(2) {
                prop_assert_eq!(&pair[0].to, &pair[1].from);
            }
            let mut seen = HashSet::new();
            prop_assert!(seen.insert(from.clone()));
            for edge in path.iter() {
                prop_assert!(seen.insert(edge.to.clone()), "format visited twice");
            }
        }
    }
}
