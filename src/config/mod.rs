//! Configuration layer: built-in profile layouts and the optional JSON
//! layout file that replaces them.

pub mod layout;

pub use layout::{Extraction, FieldLayout, LayoutConfig, RowLayouts, TableLayout, TableLayouts};
