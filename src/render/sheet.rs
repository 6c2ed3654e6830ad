use crate::error::MergeError;
use crate::merge::{FieldSheet, MergedTable, MergedTables, SheetLine};

use std::fs::File;
use std::io::Write;
use std::path::Path;

fn csv_writer<W: Write>(out: W) -> csv::Writer<W> {
    // Banner, header and blank rows all differ in width.
    csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_writer(out)
}

/// A real empty line. `write_record` on an empty record emits `""`.
fn write_blank<W: Write>(writer: &mut csv::Writer<W>) -> Result<(), MergeError> {
    writer.flush()?;
    writer.get_mut().write_all(b"\n")?;
    Ok(())
}

fn column_name(header_row: &[String], index: usize) -> &str {
    header_row.get(index).map_or("", String::as_str)
}

fn write_table<W: Write>(
    writer: &mut csv::Writer<W>,
    table: &MergedTable,
    rank_labels: &[&str],
) -> Result<(), MergeError> {
    let width = table.identity_width();
    let empty: Vec<String> = Vec::new();

    for field in 0..table.field_count() {
        writer.write_record([table.key.to_string()])?;

        let mut header: Vec<String> = table.header_row.iter().take(width).cloned().collect();
        let name = column_name(&table.header_row, width + field);
        header.extend(rank_labels.iter().map(|rank| format!("{}({})", name, rank)));
        writer.write_record(&header)?;

        for (row, identity) in table.header_columns.iter().enumerate() {
            let mut record = identity.clone();
            for rank_rows in &table.data {
                let value = rank_rows
                    .get(row)
                    .unwrap_or(&empty)
                    .get(field)
                    .map_or("", String::as_str);
                record.push(value.to_string());
            }
            writer.write_record(&record)?;
        }
        write_blank(writer)?;
    }
    write_blank(writer)?;
    Ok(())
}

/// Write every table, one block per value field, in key order.
pub fn write_table_blocks<W: Write>(merged: &MergedTables, out: W) -> Result<(), MergeError> {
    let rank_labels: Vec<&str> = merged.ranks.iter().map(|r| r.label.as_str()).collect();
    let mut writer = csv_writer(out);
    for table in &merged.tables {
        write_table(&mut writer, table, &rank_labels)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write one row per retained line position of the reference rank.
pub fn write_field_sheet<W: Write>(sheet: &FieldSheet, out: W) -> Result<(), MergeError> {
    let mut writer = csv_writer(out);

    for line in &sheet.lines {
        match line {
            SheetLine::Blank => write_blank(&mut writer)?,
            SheetLine::Program(key) => {
                let mut record = vec![key.to_string()];
                record.extend(sheet.ranks.iter().map(|r| r.label.clone()));
                writer.write_record(&record)?;
            }
            SheetLine::Header { identity, field } => {
                let mut record = identity.clone();
                record.extend(sheet.ranks.iter().map(|r| format!("{}({})", field, r.label)));
                writer.write_record(&record)?;
            }
            SheetLine::Row { identity, values } => {
                writer.write_record(identity.iter().chain(values))?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}

/// Create `path` and hand it to `write`. Only called once all inputs parsed.
pub fn write_csv_file<F>(path: &Path, write: F) -> Result<(), MergeError>
where
    F: FnOnce(File) -> Result<(), MergeError>,
{
    let file = File::create(path)?;
    write(file)
}
