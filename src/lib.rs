#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod forest;
pub mod geometry;
pub mod label;
pub mod layout;
pub mod layout_dump;
pub mod mdom;
pub mod style;
pub mod taint;
pub mod text_metrics;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, StyleConfig, load_config};
pub use document::{Document, LoadedDocument};
pub use error::{DocumentError, ForestError, PathDataError};
pub use forest::{Forest, MdomId, Node, NodeId, Tree, TreeId};
pub use label::{Label, TextRun};
pub use layout::{redraw_forest, redraw_node, redraw_tree};
pub use taint::{StaleScope, Taint};
pub use text_metrics::{DeterministicTextMetrics, FontTextMetrics, TextMetrics};
