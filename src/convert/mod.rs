// src/convert/mod.rs

//! Format conversion.
//!
//! - [`format`]: the format registry and content sniffing.
//! - [`graph`]: converters as a directed graph; shortest paths.
//! - [`script`]: the generated shell script for one path.
//! - [`converter`]: runs a script through the job queue and reports back.

pub mod converter;
pub mod format;
pub mod graph;
pub mod script;

pub use converter::{Converter, ConverterState};
pub use format::{is_gzipped, Format, Formats};
pub use graph::{ConversionEdge, ConversionGraph, ConversionPath};
pub use script::ConversionScript;
