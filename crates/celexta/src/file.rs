//! File helpers for side files: atomic writes, CSV tables and gzip blobs.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::error::{CelextaError, Result};

/// Writes `bytes` to a temporary file next to `path`, then renames it into
/// place. Parent directories are created.
pub fn atomic_write(path: impl AsRef<Path>, bytes: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(parent).map_err(|e| CelextaError::io(parent, e))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());
    let temp_path = parent.join(format!(".{}.tmp.{}", file_name, std::process::id()));

    let result = fs::write(&temp_path, bytes).and_then(|()| fs::rename(&temp_path, path));
    if let Err(source) = result {
        fs::remove_file(&temp_path).ok();
        return Err(CelextaError::io(path, source));
    }
    Ok(())
}

/// Reads a whole file.
pub fn read_bytes(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    fs::read(path).map_err(|e| CelextaError::io(path, e))
}

/// Gzip-compresses `data` into `path`.
pub fn write_gzip(path: impl AsRef<Path>, data: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| CelextaError::io(path, e))?;
    let compressed = encoder.finish().map_err(|e| CelextaError::io(path, e))?;
    atomic_write(path, &compressed)
}

/// Reads and decompresses a gzip file.
pub fn read_gzip(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let compressed = read_bytes(path)?;
    let mut decoder = GzDecoder::new(compressed.as_slice());
    let mut data = Vec::new();
    decoder
        .read_to_end(&mut data)
        .map_err(|e| CelextaError::io(path, e))?;
    Ok(data)
}

/// A CSV file held as text: one header row and string records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvTable {
    /// Column names.
    pub headers: Vec<String>,
    /// Records, each as long as `headers`.
    pub records: Vec<Vec<String>>,
}

impl CsvTable {
    /// Position of a column, ignoring ASCII case and surrounding spaces.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    }

    /// Like [`column`](Self::column), but a missing column is an error
    /// naming `path`.
    pub fn require_column(&self, name: &str, path: &Path) -> Result<usize> {
        self.column(name).ok_or_else(|| CelextaError::MissingColumn {
            path: path.to_path_buf(),
            column: name.to_string(),
        })
    }
}

/// Reads a headed CSV file. Leading and trailing spaces of fields are
/// trimmed; `#` starts a comment line.
pub fn read_csv(path: impl AsRef<Path>) -> Result<CsvTable> {
    let path = path.as_ref();
    let bytes = read_bytes(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(bytes.as_slice());

    let headers = reader
        .headers()?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    let mut records = Vec::new();
    for record in reader.records() {
        records.push(record?.iter().map(str::to_string).collect());
    }
    Ok(CsvTable { headers, records })
}

/// Writes a headed CSV file atomically.
pub fn write_csv(path: impl AsRef<Path>, table: &CsvTable) -> Result<()> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.headers)?;
    for record in &table.records {
        writer.write_record(record)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| CelextaError::io(path.as_ref(), e.into_error()))?;
    atomic_write(path, &bytes)
}

/// Empties the directory at `path`, creating it if missing.
pub fn reset_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        fs::remove_dir_all(path).map_err(|e| CelextaError::io(path, e))?;
    }
    fs::create_dir_all(path).map_err(|e| CelextaError::io(path, e))
}

/// Makes `path` absolute without requiring it to exist.
pub fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_write_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/file.txt");
        atomic_write(&path, b"hello").unwrap();
        assert_eq!(read_bytes(&path).unwrap(), b"hello");
        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp."))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_gzip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixels.f32.gz");
        let data: Vec<u8> = (0..=255).cycle().take(4096).collect();
        write_gzip(&path, &data).unwrap();
        assert!(read_bytes(&path).unwrap().len() < data.len());
        assert_eq!(read_gzip(&path).unwrap(), data);
    }

    #[test]
    fn test_csv_columns_are_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sources.csv");
        fs::write(&path, "# exported\nra, Dec ,mag\n10.0, 20.0, 18.5\n").unwrap();

        let table = read_csv(&path).unwrap();
        assert_eq!(table.column("RA"), Some(0));
        assert_eq!(table.column("DEC"), Some(1));
        assert_eq!(table.records, vec![vec!["10.0", "20.0", "18.5"]]);
        assert!(matches!(
            table.require_column("flux", &path),
            Err(CelextaError::MissingColumn { column, .. }) if column == "flux"
        ));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = read_csv("/nonexistent/celexta/table.csv").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/celexta/table.csv"));
    }

    #[test]
    fn test_reset_dir() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("session");
        atomic_write(data.join("tab/old.csv"), b"x").unwrap();
        reset_dir(&data).unwrap();
        assert!(data.is_dir());
        assert_eq!(fs::read_dir(&data).unwrap().count(), 0);
        reset_dir(dir.path().join("fresh")).unwrap();
        assert!(dir.path().join("fresh").is_dir());
    }
}
