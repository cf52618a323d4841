//! Column-oriented village table with CSV input and output
//!
//! The table keeps every input column in its original order. Columns are typed
//! and nullable: on load a column becomes [`Column::Float`] when all of its
//! non-null cells parse as numbers, otherwise [`Column::Text`]. The cleaning
//! stage later narrows `population` to [`Column::Integer`].

use crate::error::{PipelineError, Result};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

pub const VILLAGE_NAME: &str = "village_name";
pub const POPULATION: &str = "population";
pub const AREA_SQKM: &str = "area_sqkm";
pub const POP_DENSITY: &str = "pop_density";
pub const DISTANCE_FROM_GRID_KM: &str = "distance_from_grid_km";
pub const ELECTRIFICATION_PCT: &str = "electrification_pct";

/// Columns every village dataset must provide
pub const REQUIRED_COLUMNS: [&str; 6] = [
    VILLAGE_NAME,
    POPULATION,
    AREA_SQKM,
    POP_DENSITY,
    DISTANCE_FROM_GRID_KM,
    ELECTRIFICATION_PCT,
];

/// Cell spellings treated as missing on load (exact match, no trimming)
const NULL_TOKENS: [&str; 12] = [
    "", "NA", "N/A", "n/a", "NaN", "nan", "-nan", "null", "NULL", "None", "<NA>", "#N/A",
];

fn is_null_token(cell: &str) -> bool {
    NULL_TOKENS.contains(&cell)
}

/// A single typed, nullable column
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Text(Vec<Option<String>>),
    Integer(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
}

impl Column {
    /// Infer a column type from raw cells
    fn infer(cells: Vec<Option<String>>) -> Self {
        let all_numeric = cells
            .iter()
            .flatten()
            .all(|cell| cell.trim().parse::<f64>().is_ok());

        if all_numeric {
            Column::Float(
                cells
                    .into_iter()
                    .map(|cell| cell.and_then(|c| c.trim().parse::<f64>().ok()))
                    .collect(),
            )
        } else {
            Column::Text(cells)
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Text(values) => values.len(),
            Column::Integer(values) => values.len(),
            Column::Float(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_null(&self, row: usize) -> bool {
        match self {
            Column::Text(values) => values[row].is_none(),
            Column::Integer(values) => values[row].is_none(),
            Column::Float(values) => values[row].is_none(),
        }
    }

    pub fn null_count(&self) -> usize {
        (0..self.len()).filter(|&row| self.is_null(row)).count()
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Column::Text(_))
    }

    /// Pandas-style dtype label
    pub fn dtype(&self) -> &'static str {
        match self {
            Column::Text(_) => "text",
            Column::Integer(_) => "int64",
            Column::Float(_) => "float64",
        }
    }

    /// Numeric value of a cell, `None` for nulls and text columns
    pub fn numeric(&self, row: usize) -> Option<f64> {
        match self {
            Column::Integer(values) => values[row].map(|v| v as f64),
            Column::Float(values) => values[row],
            Column::Text(_) => None,
        }
    }

    /// Non-null numeric values in row order
    pub fn numeric_values(&self) -> Vec<f64> {
        (0..self.len()).filter_map(|row| self.numeric(row)).collect()
    }

    /// Text form of a cell as written to CSV (nulls become empty)
    pub fn display(&self, row: usize) -> String {
        match self {
            Column::Text(values) => values[row].clone().unwrap_or_default(),
            Column::Integer(values) => values[row].map(|v| v.to_string()).unwrap_or_default(),
            Column::Float(values) => values[row].map(format_float).unwrap_or_default(),
        }
    }

    /// Keep only rows whose mask entry is true
    pub(crate) fn retain(&mut self, keep: &[bool]) {
        fn filter<T>(values: &mut Vec<T>, keep: &[bool]) {
            let mut mask = keep.iter();
            values.retain(|_| *mask.next().unwrap_or(&false));
        }

        match self {
            Column::Text(values) => filter(values, keep),
            Column::Integer(values) => filter(values, keep),
            Column::Float(values) => filter(values, keep),
        }
    }
}

/// Floats keep a decimal point so they read back as floats
fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Ordered collection of equally long named columns
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<Column>,
}

impl Table {
    /// Build a table from named columns
    pub fn from_columns(columns: Vec<(String, Column)>) -> Result<Self> {
        let mut table = Table::default();
        for (name, column) in columns {
            table.push_column(name, column)?;
        }
        Ok(table)
    }

    fn push_column(&mut self, name: String, column: Column) -> Result<()> {
        if let Some(first) = self.columns.first() {
            if first.len() != column.len() {
                return Err(PipelineError::DataQuality {
                    column: name,
                    message: format!(
                        "column has {} rows, table has {}",
                        column.len(),
                        first.len()
                    ),
                });
            }
        }
        self.names.push(name);
        self.columns.push(column);
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows(), self.n_cols())
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.names.iter().map(String::as_str).zip(self.columns.iter())
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index_of(name).map(|i| &self.columns[i])
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        match self.index_of(name) {
            Some(i) => Some(&mut self.columns[i]),
            None => None,
        }
    }

    /// Look up a column, failing with a schema error when absent
    pub fn require(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| PipelineError::missing_column(name))
    }

    pub fn require_mut(&mut self, name: &str) -> Result<&mut Column> {
        self.column_mut(name)
            .ok_or_else(|| PipelineError::missing_column(name))
    }

    /// Check that all named columns exist
    pub fn require_all(&self, names: &[&str]) -> Result<()> {
        for name in names {
            self.require(name)?;
        }
        Ok(())
    }

    /// Drop every row whose mask entry is false
    pub fn retain_rows(&mut self, keep: &[bool]) {
        debug_assert_eq!(keep.len(), self.n_rows());
        for column in &mut self.columns {
            column.retain(keep);
        }
    }

    /// Display strings for every cell of a row, in column order
    pub fn row_values(&self, row: usize) -> Vec<String> {
        self.columns.iter().map(|c| c.display(row)).collect()
    }

    /// Parse a table from CSV text with a header row
    ///
    /// `source` names the origin in error messages.
    pub fn from_reader<R: Read>(reader: R, source: &str) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let csv_error = |e: csv::Error| PipelineError::Csv {
            path: source.to_string(),
            message: e.to_string(),
        };

        let headers: Vec<String> = csv_reader
            .headers()
            .map_err(csv_error)?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        for record in csv_reader.records() {
            let record = record.map_err(csv_error)?;
            for (column, value) in cells.iter_mut().zip(record.iter()) {
                column.push(if is_null_token(value) {
                    None
                } else {
                    Some(value.to_string())
                });
            }
        }

        let columns = headers
            .into_iter()
            .zip(cells)
            .map(|(name, raw)| (name, Column::infer(raw)))
            .collect();
        Self::from_columns(columns)
    }

    /// Load a CSV file
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| PipelineError::file_access(path, e))?;
        let table = Self::from_reader(file, &path.display().to_string())?;
        tracing::debug!(path = %path.display(), rows = table.n_rows(), cols = table.n_cols(), "loaded table");
        Ok(table)
    }

    /// Write the table as CSV with a header row
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        let report = |e: csv::Error| PipelineError::Csv {
            path: "<output>".to_string(),
            message: e.to_string(),
        };

        csv_writer.write_record(&self.names).map_err(report)?;
        for row in 0..self.n_rows() {
            csv_writer.write_record(self.row_values(row)).map_err(report)?;
        }
        csv_writer
            .flush()
            .map_err(|e| PipelineError::Csv {
                path: "<output>".to_string(),
                message: e.to_string(),
            })
    }

    /// Write the table to a file, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| PipelineError::file_access(parent, e))?;
        }
        let file = File::create(path).map_err(|e| PipelineError::file_access(path, e))?;
        self.to_writer(std::io::BufWriter::new(file))
            .map_err(|e| match e {
                PipelineError::Csv { message, .. } => PipelineError::file_access(path, message),
                other => other,
            })?;
        tracing::debug!(path = %path.display(), rows = self.n_rows(), "saved table");
        Ok(())
    }

    /// Serialize to an in-memory CSV string
    pub fn to_csv_string(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.to_writer(&mut buffer)?;
        String::from_utf8(buffer).map_err(|e| PipelineError::Csv {
            path: "<output>".to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Table {
        Table::from_reader(text.as_bytes(), "test").unwrap()
    }

    #[test]
    fn test_infers_numeric_and_text_columns() {
        let table = parse("village_name,population,notes\nA,100,x\nB,,y\n");
        assert_eq!(table.shape(), (2, 3));
        assert_eq!(table.column("village_name").unwrap().dtype(), "text");
        assert_eq!(table.column("population").unwrap().dtype(), "float64");
        assert_eq!(table.column("notes").unwrap().dtype(), "text");
    }

    #[test]
    fn test_null_tokens_become_missing() {
        let table = parse("a,b\nNaN,x\nNA,None\n3.5,\n");
        let a = table.column("a").unwrap();
        assert!(a.is_numeric());
        assert_eq!(a.null_count(), 2);
        assert_eq!(a.numeric(2), Some(3.5));
        assert_eq!(table.column("b").unwrap().null_count(), 2);
    }

    #[test]
    fn test_whitespace_is_not_a_null_token() {
        let table = parse("village_name,value\n \t,1\n NA,2\nNA,3\n");
        let names = table.column("village_name").unwrap();
        assert_eq!(names.null_count(), 1);
        assert_eq!(names.display(0), " \t");
        assert_eq!(names.display(1), " NA");
        assert!(names.is_null(2));
    }

    #[test]
    fn test_ragged_rows_are_csv_errors() {
        let err = Table::from_reader("a,b\n1,2\n3\n".as_bytes(), "ragged.csv").unwrap_err();
        assert!(matches!(err, PipelineError::Csv { ref path, .. } if path == "ragged.csv"));
    }

    #[test]
    fn test_require_missing_column() {
        let table = parse("a\n1\n");
        assert!(matches!(
            table.require("pop_density"),
            Err(PipelineError::MissingColumn { ref column }) if column == "pop_density"
        ));
    }

    #[test]
    fn test_retain_rows_filters_every_column() {
        let mut table = parse("name,value\nA,1\nB,2\nC,3\n");
        table.retain_rows(&[true, false, true]);
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.row_values(1), vec!["C".to_string(), "3.0".to_string()]);
    }

    #[test]
    fn test_floats_keep_decimal_point() {
        assert_eq!(format_float(30.0), "30.0");
        assert_eq!(format_float(12.25), "12.25");
    }

    #[test]
    fn test_csv_round_trip_preserves_table() {
        let table = parse("village_name,population,area\n\"Kisii, East\",1200,3.5\nB,,7\n");
        let text = table.to_csv_string().unwrap();
        assert_eq!(parse(&text), table);
    }

    #[test]
    fn test_mismatched_column_lengths_rejected() {
        let result = Table::from_columns(vec![
            ("a".to_string(), Column::Float(vec![Some(1.0)])),
            ("b".to_string(), Column::Float(vec![Some(1.0), Some(2.0)])),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_file_is_file_access_error() {
        let err = Table::load(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, PipelineError::FileAccess { .. }));
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/out.csv");
        parse("a\n1\n").save(&path).unwrap();
        assert!(path.exists());
    }
}
