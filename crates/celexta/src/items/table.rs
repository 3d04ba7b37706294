use std::path::Path;
use std::sync::Arc;

use crate::astro::SkyCoord;
use crate::error::{CelextaError, Result};
use crate::file::{self, CsvTable};

use super::{CollectionItem, Color, ItemId, ItemKind, ItemUpdate};

/// Default marker size, in screen pixels.
pub const DEFAULT_MARKER_SIZE: f64 = 10.0;

/// One catalog entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    /// Sky position.
    pub position: SkyCoord,
    /// Values of the extra columns, aligned with [`CatalogTable::columns`].
    pub values: Vec<String>,
}

/// A catalog of sky positions plotted as markers.
///
/// Rows are shared between clones; editing a table never touches them.
#[derive(Debug, Clone)]
pub struct CatalogTable {
    id: ItemId,
    name: String,
    color: Option<Color>,
    marker_size: f64,
    columns: Arc<[String]>,
    rows: Arc<[TableRow]>,
}

impl CatalogTable {
    /// A table named "Table" with no extra columns.
    pub fn new(positions: impl IntoIterator<Item = SkyCoord>) -> Self {
        let rows = positions
            .into_iter()
            .map(|position| TableRow {
                position,
                values: Vec::new(),
            })
            .collect();
        Self::with_columns(Vec::new(), rows)
    }

    /// A table with extra named columns. Each row's `values` should be as
    /// long as `columns`.
    pub fn with_columns(columns: Vec<String>, rows: Vec<TableRow>) -> Self {
        Self {
            id: ItemId::next(),
            name: "Table".to_string(),
            color: None,
            marker_size: DEFAULT_MARKER_SIZE,
            columns: columns.into(),
            rows: rows.into(),
        }
    }

    /// Replaces the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the color.
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// Sets the marker size.
    pub fn with_marker_size(mut self, size: f64) -> Self {
        self.marker_size = size;
        self
    }

    /// Names of the extra columns.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows.
    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Marker size, in screen pixels.
    pub fn marker_size(&self) -> f64 {
        self.marker_size
    }

    /// Reads a CSV file with `RA` and `DEC` columns in degrees (any case).
    /// Other columns are kept as text.
    ///
    /// The table is named after the file stem. A missing coordinate column
    /// or an unparsable coordinate fails the whole load.
    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let csv = file::read_csv(path)?;
        let ra_col = csv.require_column("RA", path)?;
        let dec_col = csv.require_column("DEC", path)?;

        let extra: Vec<usize> = (0..csv.headers.len())
            .filter(|i| *i != ra_col && *i != dec_col)
            .collect();
        let columns = extra.iter().map(|i| csv.headers[*i].clone()).collect();

        let mut rows = Vec::with_capacity(csv.records.len());
        for (line, record) in csv.records.iter().enumerate() {
            let coordinate = |col: usize| -> Result<f64> {
                record
                    .get(col)
                    .and_then(|v| v.parse::<f64>().ok())
                    .ok_or_else(|| {
                        CelextaError::InvalidDescriptor(format!(
                            "{}: row {} has an invalid '{}' value",
                            path.display(),
                            line + 1,
                            csv.headers[col]
                        ))
                    })
            };
            rows.push(TableRow {
                position: SkyCoord::from_deg(coordinate(ra_col)?, coordinate(dec_col)?),
                values: extra
                    .iter()
                    .map(|i| record.get(*i).cloned().unwrap_or_default())
                    .collect(),
            });
        }

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Table".to_string());
        tracing::debug!(
            target: celexta_core::logging::targets::PERSIST,
            path = %path.display(),
            rows = rows.len(),
            "read table"
        );
        Ok(Self::with_columns(columns, rows).with_name(name))
    }

    /// Writes the table as CSV with `RA`, `DEC` first.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut headers = vec!["RA".to_string(), "DEC".to_string()];
        headers.extend(self.columns.iter().cloned());
        let records = self
            .rows
            .iter()
            .map(|row| {
                let mut record = vec![
                    format!("{:.10}", row.position.ra.deg()),
                    format!("{:.10}", row.position.dec.deg()),
                ];
                record.extend(row.values.iter().cloned());
                record
            })
            .collect();
        file::write_csv(path, &CsvTable { headers, records })
    }
}

impl CollectionItem for CatalogTable {
    const KIND: ItemKind = ItemKind::Table;

    fn id(&self) -> ItemId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn color(&self) -> Option<Color> {
        self.color
    }

    fn set_color(&mut self, color: Color) {
        self.color = Some(color);
    }

    fn apply_update(&mut self, update: &ItemUpdate) -> bool {
        let mut applied = false;
        if let Some(name) = &update.name {
            self.name = name.clone();
            applied = true;
        }
        if let Some(color) = update.color {
            self.color = Some(color);
            applied = true;
        }
        if let Some(size) = update.marker_size {
            self.marker_size = size;
            applied = true;
        }
        applied
    }
}
