// src/convert/graph.rs

use std::collections::HashMap;

use petgraph::algo::{astar, dijkstra};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::config::model::ConverterConfig;

use super::format::{Format, Formats};

/// One converter: turns a `from` file into a `to` file by running `command`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionEdge {
    pub from: String,
    pub to: String,
    /// Command template using `$$i`, `$$b` and `$$o`.
    pub command: String,
}

/// Ordered chain of converters. Each edge starts where the previous one
/// ended and no format is visited twice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionPath {
    edges: Vec<ConversionEdge>,
}

impl ConversionPath {
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> &[ConversionEdge] {
        &self.edges
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConversionEdge> {
        self.edges.iter()
    }
}

/// Directed graph of available converters, keyed by format name.
#[derive(Debug, Clone, Default)]
pub struct ConversionGraph {
    graph: DiGraph<String, String>,
    nodes: HashMap<String, NodeIndex>,
}

impl ConversionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(converters: &[ConverterConfig]) -> Self {
        let mut graph = Self::new();
        for conv in converters {
            graph.add_edge(&conv.from, &conv.to, &conv.cmd);
        }
        graph
    }

    /// Add a converter. A second converter for the same pair replaces the
    /// first.
    pub fn add_edge(&mut self, from: &str, to: &str, command: &str) {
        let a = self.node(from);
        let b = self.node(to);
        self.graph.update_edge(a, b, command.to_string());
    }

    /// Whether `to` can be produced from `from`. Always true for `from == to`.
    pub fn is_reachable(&self, from: &str, to: &str) -> bool {
        from == to || !self.get_path(from, to).is_empty()
    }

    /// Shortest conversion path by edge count.
    ///
    /// Empty when `from == to` or when `to` is unreachable.
    pub fn get_path(&self, from: &str, to: &str) -> ConversionPath {
        if from == to {
            return ConversionPath::default();
        }
        let (Some(&start), Some(&goal)) = (self.nodes.get(from), self.nodes.get(to)) else {
            return ConversionPath::default();
        };

        let Some((_, nodes)) = astar(&self.graph, start, |n| n == goal, |_| 1usize, |_| 0) else {
            return ConversionPath::default();
        };

        let edges = nodes
            .windows(2)
            .filter_map(|pair| {
                let edge = self.graph.find_edge(pair[0], pair[1])?;
                Some(ConversionEdge {
                    from: self.graph[pair[0]].clone(),
                    to: self.graph[pair[1]].clone(),
                    command: self.graph[edge].clone(),
                })
            })
            .collect();

        ConversionPath { edges }
    }

    /// The closest loadable format to `from`.
    ///
    /// `from` itself when it is loadable; otherwise the reachable loadable
    /// format with the shortest path, ties going to the format listed first
    /// in `formats`.
    pub fn nearest_loadable<'a>(&self, from: &str, formats: &'a Formats) -> Option<&'a Format> {
        if formats.is_loadable(from) {
            return formats.get(from);
        }
        let &start = self.nodes.get(from)?;
        let dist = dijkstra(&self.graph, start, None, |_| 1usize);

        let mut best: Option<(usize, &Format)> = None;
        for fmt in formats.loadable() {
            let Some(d) = self.nodes.get(&fmt.name).and_then(|n| dist.get(n)) else {
                continue;
            };
            if best.is_none_or(|(bd, _)| *d < bd) {
                best = Some((*d, fmt));
            }
        }
        best.map(|(_, fmt)| fmt)
    }

    /// All converters, in insertion order.
    pub fn edges(&self) -> Vec<ConversionEdge> {
        self.graph
            .edge_references()
            .map(|e| ConversionEdge {
                from: self.graph[e.source()].clone(),
                to: self.graph[e.target()].clone(),
                command: e.weight().clone(),
            })
            .collect()
    }

    fn node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.nodes.insert(name.to_string(), idx);
        idx
    }
}
