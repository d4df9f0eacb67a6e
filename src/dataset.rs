use encoding_rs::Encoding;

use crate::{error::FetchError, io_utils};

/// Header names of the raw measurement column, which overrides never touch.
pub const VALUE_COLUMNS: &[&str] = &["Value", "value"];

pub const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub type Cell = Option<String>;

pub fn is_value_column(name: &str) -> bool {
    VALUE_COLUMNS.contains(&name)
}

pub fn is_missing_marker(field: &str) -> bool {
    MISSING_MARKERS.contains(&field)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }

    pub fn from_strs(name: impl Into<String>, cells: &[Option<&str>]) -> Self {
        Self::new(
            name,
            cells.iter().map(|cell| cell.map(str::to_string)).collect(),
        )
    }

    pub fn missing_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_none()).count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    columns: Vec<Column>,
    row_count: usize,
}

impl Dataset {
    /// Builds a dataset from equally sized columns.
    ///
    /// # Panics
    ///
    /// Panics when the columns do not all hold the same number of cells.
    pub fn from_columns(columns: Vec<Column>) -> Self {
        let row_count = columns.first().map_or(0, |column| column.cells.len());
        assert!(
            columns.iter().all(|column| column.cells.len() == row_count),
            "all columns must hold the same number of cells"
        );
        Self { columns, row_count }
    }

    pub fn from_csv_bytes(
        bytes: &[u8],
        encoding: &'static Encoding,
        identifier: &str,
    ) -> Result<Self, FetchError> {
        let text = io_utils::decode_bytes(bytes, encoding).ok_or_else(|| FetchError::Decode {
            identifier: identifier.to_string(),
            encoding: encoding.name(),
        })?;
        let csv_error = |source| FetchError::Csv {
            identifier: identifier.to_string(),
            source,
        };

        let mut reader =
            io_utils::open_csv_reader(text.as_bytes(), io_utils::DEFAULT_CSV_DELIMITER);
        let headers = reader.headers().map_err(csv_error)?.clone();
        let mut columns = headers
            .iter()
            .map(|name| Column::new(name, Vec::new()))
            .collect::<Vec<_>>();
        let mut row_count = 0usize;
        for record in reader.records() {
            let record = record.map_err(csv_error)?;
            for (column, field) in columns.iter_mut().zip(record.iter()) {
                let cell = (!is_missing_marker(field)).then(|| field.to_string());
                column.cells.push(cell);
            }
            row_count += 1;
        }
        Ok(Self { columns, row_count })
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.name.as_str())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0 || self.columns.is_empty()
    }

    pub fn replace_cells(&mut self, idx: usize, cells: Vec<Cell>) {
        assert_eq!(cells.len(), self.row_count, "replacement column length");
        self.columns[idx].cells = cells;
    }

    pub fn contains_value(&self, value: &str) -> bool {
        self.columns
            .iter()
            .flat_map(|column| column.cells.iter())
            .any(|cell| cell.as_deref() == Some(value))
    }

    pub fn row(&self, idx: usize) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .map(move |column| column.cells[idx].as_deref().unwrap_or(""))
    }
}
