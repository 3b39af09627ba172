//! Loading and saving workbooks
//!
//! Three layouts are supported:
//! - a `.json` file holding the whole workbook
//! - a single `.csv` file, loaded as one sheet named after the file stem
//! - a directory of CSV files, one per sheet, with an optional
//!   `manifest.json` recording sheet order and table regions

use crate::cell::CellValue;
use crate::error::{Error, Result};
use crate::grid::{Rect, Workbook};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File name of the directory manifest
pub const MANIFEST_FILE: &str = "manifest.json";

/// Sheet order and region metadata for a CSV directory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub sheets: Vec<ManifestSheet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestSheet {
    pub name: String,
    /// CSV file, relative to the manifest
    pub file: PathBuf,
    #[serde(default)]
    pub regions: Vec<ManifestRegion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestRegion {
    pub name: String,
    pub bounds: Rect,
}

/// Parse CSV content into rows of typed cells. Every record is data; the
/// header row is just the first row of the grid.
pub fn parse_csv_rows<R: Read>(reader: R, source: &Path) -> Result<Vec<Vec<CellValue>>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true) // Allow varying number of fields
        .from_reader(reader);

    let mut rows = Vec::new();
    for result in csv_reader.records() {
        let record = result.map_err(|e| Error::Csv {
            path: source.to_path_buf(),
            source: e,
        })?;
        rows.push(record.iter().map(CellValue::parse).collect());
    }
    Ok(rows)
}

fn read_csv_file(path: &Path) -> Result<Vec<Vec<CellValue>>> {
    let file = File::open(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_csv_rows(BufReader::new(file), path)
}

fn write_csv_file(path: &Path, rows: &[Vec<CellValue>]) -> Result<()> {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut writer = csv::WriterBuilder::new()
        .flexible(false)
        .from_writer(BufWriter::new(File::create(path)?));

    for row in rows {
        let mut record: Vec<String> = row.iter().map(CellValue::to_string_value).collect();
        record.resize(width, String::new());
        writer.write_record(&record).map_err(|e| Error::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    writer.flush()?;
    Ok(())
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn is_csv(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Sheet1".to_string())
}

/// Load a workbook from a `.json` file, a `.csv` file or a CSV directory
pub fn load_workbook<P: AsRef<Path>>(path: P) -> Result<Workbook> {
    let path = path.as_ref();
    if path.is_dir() {
        return load_directory(path);
    }
    if is_json(path) {
        let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        return Ok(serde_json::from_str(&content)?);
    }

    let mut workbook = Workbook::new();
    workbook.add_sheet_with_rows(&stem(path), read_csv_file(path)?)?;
    Ok(workbook)
}

fn load_directory(dir: &Path) -> Result<Workbook> {
    let manifest_path = dir.join(MANIFEST_FILE);
    let manifest = if manifest_path.is_file() {
        let content = fs::read_to_string(&manifest_path).map_err(|e| Error::FileRead {
            path: manifest_path.clone(),
            source: e,
        })?;
        serde_json::from_str(&content)?
    } else {
        discover_sheets(dir)?
    };

    let mut workbook = Workbook::new();
    for entry in &manifest.sheets {
        let rows = read_csv_file(&dir.join(&entry.file))?;
        let sheet = workbook.add_sheet_with_rows(&entry.name, rows)?;
        for region in &entry.regions {
            workbook.restore_region(sheet, &region.name, region.bounds)?;
        }
    }
    tracing::debug!(dir = %dir.display(), sheets = manifest.sheets.len(), "loaded workbook");
    Ok(workbook)
}

/// Every CSV directly inside `dir`, in file-name order
fn discover_sheets(dir: &Path) -> Result<Manifest> {
    let mut sheets = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type().is_file() && is_csv(path) {
            sheets.push(ManifestSheet {
                name: stem(path),
                file: PathBuf::from(entry.file_name()),
                regions: Vec::new(),
            });
        }
    }
    Ok(Manifest { sheets })
}

/// File name for a sheet: unsafe characters become `_`
fn sheet_file_name(name: &str, used: &mut HashSet<String>) -> String {
    let base: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let base = if base.is_empty() { "sheet".to_string() } else { base };

    let mut candidate = format!("{}.csv", base);
    let mut n = 2;
    while !used.insert(candidate.to_lowercase()) {
        candidate = format!("{}_{}.csv", base, n);
        n += 1;
    }
    candidate
}

/// Save a workbook. A `.json` path gets the whole workbook as JSON; any other
/// path is treated as a directory of CSV files plus a manifest.
/// Returns the files written.
pub fn save_workbook<P: AsRef<Path>>(workbook: &Workbook, path: P) -> Result<Vec<PathBuf>> {
    let path = path.as_ref();
    if is_json(path) {
        fs::write(path, serde_json::to_string_pretty(workbook)?)?;
        return Ok(vec![path.to_path_buf()]);
    }

    fs::create_dir_all(path)?;
    let mut used = HashSet::new();
    let mut manifest = Manifest::default();
    let mut written = Vec::new();

    for sheet in workbook.sheets() {
        let file = sheet_file_name(&sheet.name, &mut used);
        let target = path.join(&file);
        write_csv_file(&target, sheet.rows())?;
        written.push(target);

        manifest.sheets.push(ManifestSheet {
            name: sheet.name.clone(),
            file: PathBuf::from(file),
            regions: sheet
                .regions
                .iter()
                .map(|r| ManifestRegion {
                    name: r.name.clone(),
                    bounds: r.bounds,
                })
                .collect(),
        });
    }

    let manifest_path = path.join(MANIFEST_FILE);
    fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;
    written.push(manifest_path);
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::GridStore;

    #[test]
    fn test_parse_csv_rows_is_flexible() {
        let csv = "Plant,Storage location,Material\nP1,F010,000123\nP2,,\n";
        let rows = parse_csv_rows(csv.as_bytes(), Path::new("inline.csv")).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][1], CellValue::from("Storage location"));
        assert_eq!(rows[1][2], CellValue::from("000123"));
        assert_eq!(rows[2][1], CellValue::Empty);
    }

    #[test]
    fn test_sheet_file_names_are_unique() {
        let mut used = HashSet::new();
        assert_eq!(sheet_file_name("SAP", &mut used), "SAP.csv");
        assert_eq!(sheet_file_name("sap", &mut used), "sap_2.csv");
        assert_eq!(sheet_file_name("a/b", &mut used), "a_b.csv");
    }

    #[test]
    fn test_directory_without_manifest_loads_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b_second.csv"), "x\n1\n").unwrap();
        fs::write(dir.path().join("a_first.csv"), "y\n2\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let wb = load_workbook(dir.path()).unwrap();
        let names: Vec<&str> = wb.sheets().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a_first", "b_second"]);
    }

    #[test]
    fn test_directory_save_keeps_regions() {
        let dir = tempfile::tempdir().unwrap();
        let mut wb = Workbook::new();
        let rows = vec![
            vec![CellValue::from("Material"), CellValue::from("Qty")],
            vec![CellValue::from("M1"), CellValue::Integer(5)],
        ];
        let sheet = wb.add_sheet_with_rows("SAP", rows).unwrap();
        let region = wb.create_region(sheet, Rect::new(0, 0, 2, 2), true).unwrap();
        wb.rename_region(region, "tbl_SAP").unwrap();

        let out = dir.path().join("out");
        let written = save_workbook(&wb, &out).unwrap();
        assert_eq!(written.len(), 2);

        let loaded = load_workbook(&out).unwrap();
        let sheet = loaded.sheet_by_name("SAP").unwrap();
        assert_eq!(sheet.regions[0].name, "tbl_SAP");
        assert_eq!(sheet.regions[0].bounds, Rect::new(0, 0, 2, 2));
        assert_eq!(sheet.get(1, 1), &CellValue::Integer(5));
    }

    #[test]
    fn test_json_save_and_single_csv_load() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("Raw.csv");
        fs::write(&csv_path, "Material,Qty\nM1,2.5\n").unwrap();

        let wb = load_workbook(&csv_path).unwrap();
        let raw = wb.get_sheet("Raw").unwrap();
        assert_eq!(wb.occupied_extent(raw).unwrap(), Some(Rect::new(0, 0, 2, 2)));

        let json_path = dir.path().join("book.json");
        save_workbook(&wb, &json_path).unwrap();
        let loaded = load_workbook(&json_path).unwrap();
        assert_eq!(loaded.sheet_by_name("Raw").unwrap().get(1, 1), &CellValue::Float(2.5));
    }
}
