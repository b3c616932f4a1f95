//! CSV output: UTF-8 with byte-order mark for spreadsheet tools.

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::row::Row;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Write the header and every projected row. Zero rows is a hard error,
/// raised before the output file is created.
pub fn write_csv(path: &Path, columns: &[&str], rows: &[Row]) -> Result<()> {
    if rows.is_empty() {
        bail!("no rows to write; the image directory produced an empty catalog");
    }

    let mut file = File::create(path)
        .with_context(|| format!("failed to create output file: {}", path.display()))?;
    file.write_all(UTF8_BOM)?;

    let mut writer = csv::WriterBuilder::new().from_writer(file);
    writer.write_record(columns)?;
    for row in rows {
        writer.write_record(columns.iter().map(|c| row.get(c)))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to write output file: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::{ChildRow, Row};
    use std::fs;

    fn child(handle: &str, src: &str, position: &str) -> Row {
        Row::Child(ChildRow {
            handle: handle.to_string(),
            image_src: src.to_string(),
            image_position: position.to_string(),
            variant: None,
        })
    }

    #[test]
    fn test_empty_rows_is_fatal_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let err = write_csv(&path, &["Handle"], &[]);
        assert!(err.is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_output_starts_with_bom_and_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let rows = vec![child("acme", "https://host/a.png?v=1", "2")];
        write_csv(&path, &["Handle", "Image Src", "Image Position"], &rows).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..3], UTF8_BOM);
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Handle,Image Src,Image Position"));
        assert_eq!(lines.next(), Some("acme,https://host/a.png?v=1,2"));
    }

    #[test]
    fn test_missing_fields_render_as_empty_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let rows = vec![child("acme", "src", "2")];
        write_csv(&path, &["Handle", "Title", "Vendor", "Image Src"], &rows).unwrap();

        let bytes = fs::read(&path).unwrap();
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        assert_eq!(text.lines().nth(1), Some("acme,,,src"));
    }
}
