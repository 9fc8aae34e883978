//! Renderers over the analysis result: terminal text, JSON and GraphViz.
//! Renderers only read the result; nothing here re-runs analysis.

pub mod dot;
pub mod json;
pub mod text;
