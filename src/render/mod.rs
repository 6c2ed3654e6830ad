//! CSV rendering of merged tables and extracted field sheets.

pub mod sheet;

pub use sheet::{write_csv_file, write_field_sheet, write_table_blocks};
