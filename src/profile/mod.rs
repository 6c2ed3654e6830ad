//! Profile log scanning: program headers, header rows and data rows.

pub mod scan;
pub mod table;
pub mod token;

pub use scan::Scanner;
pub use table::{LineKind, ScannedFile, ScannedLine, TableKey};
pub use token::Tokenizer;
