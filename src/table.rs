//! Numeric tables with a hierarchical column index.
//!
//! Per-session results are tables whose columns are keyed by tuples such as `(unit, trial)`.
//! Combining sessions prepends a new outer level to every key, see [`Table::concat`].
use std::cmp::Ordering;
use std::path::Path;

use itertools::Itertools;

use crate::error::PixelsError;

/// A column-major table of `f64` values.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Name of the row index, e.g., `time`.
    index_name: String,
    /// Row labels, sorted in ascending order.
    index: Vec<f64>,
    /// One name per column level, e.g., `["unit", "trial"]`.
    levels: Vec<String>,
    /// Column keys, one value per level.
    columns: Vec<Vec<usize>>,
    /// Column values, one vector of `index.len()` values per column.
    values: Vec<Vec<f64>>,
}

impl Table {
    /// An empty table with the given index name and column levels.
    pub fn new(index_name: &str, index: Vec<f64>, levels: &[&str]) -> Self {
        Table {
            index_name: index_name.to_string(),
            index,
            levels: levels.iter().map(|l| l.to_string()).collect(),
            columns: vec![],
            values: vec![],
        }
    }

    /// Append a column. The key must have one value per level and the values one per row.
    pub fn push_column(&mut self, key: Vec<usize>, values: Vec<f64>) -> Result<(), PixelsError> {
        if key.len() != self.levels.len() {
            return Err(PixelsError::InvalidParameter(format!(
                "column key {:?} does not match levels {:?}",
                key, self.levels
            )));
        }
        if values.len() != self.index.len() {
            return Err(PixelsError::InvalidParameter(format!(
                "column {:?} has {} values for {} rows",
                key,
                values.len(),
                self.index.len()
            )));
        }
        self.columns.push(key);
        self.values.push(values);
        Ok(())
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn index(&self) -> &[f64] {
        &self.index
    }

    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    pub fn columns(&self) -> &[Vec<usize>] {
        &self.columns
    }

    pub fn num_rows(&self) -> usize {
        self.index.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// The values of the column with the given key, if any.
    pub fn column(&self, key: &[usize]) -> Option<&[f64]> {
        self.columns
            .iter()
            .position(|k| k == key)
            .map(|pos| self.values[pos].as_slice())
    }

    pub fn columns_iter(&self) -> impl Iterator<Item = (&[usize], &[f64])> + '_ {
        self.columns
            .iter()
            .zip(self.values.iter())
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    /// Concatenate tables side by side, keying the columns of the i-th table by `i` on a
    /// new outer level named `level`.
    ///
    /// Rows are outer-joined on the index: a row missing from a table is filled with NaN.
    /// All tables must share the same index name and column levels. An empty input gives a
    /// table with no rows and no columns, whose levels are `level` followed by `inner_levels`.
    /// NaN index values cannot be joined and are rejected.
    pub fn concat(
        tables: Vec<Table>,
        level: &str,
        index_name: &str,
        inner_levels: &[&str],
    ) -> Result<Table, PixelsError> {
        let mut levels = vec![level.to_string()];
        levels.extend(inner_levels.iter().map(|l| l.to_string()));

        if let Some(table) = tables
            .iter()
            .find(|t| t.index_name != index_name || t.levels[..] != levels[1..])
        {
            return Err(PixelsError::IncompatibleTables(format!(
                "expected index '{}' and levels {:?}, got index '{}' and levels {:?}",
                index_name,
                &levels[1..],
                table.index_name,
                table.levels
            )));
        }

        if let Some(i) = tables.iter().position(|t| t.index.iter().any(|x| x.is_nan())) {
            return Err(PixelsError::IncompatibleTables(format!(
                "table {} has a NaN index value",
                i
            )));
        }

        let index: Vec<f64> = tables
            .iter()
            .flat_map(|t| t.index.iter().cloned())
            .sorted_by(|a, b| a.total_cmp(b))
            .dedup()
            .collect();

        let mut combined = Table {
            index_name: index_name.to_string(),
            index,
            levels,
            columns: vec![],
            values: vec![],
        };

        for (i, table) in tables.into_iter().enumerate() {
            // positions of the table rows within the combined index
            let rows = table
                .index
                .iter()
                .map(|x| {
                    combined
                        .index
                        .binary_search_by(|y| y.partial_cmp(x).unwrap_or(Ordering::Equal))
                        .map_err(|_| {
                            PixelsError::IncompatibleTables(format!(
                                "table {} has index value {} which cannot be joined",
                                i, x
                            ))
                        })
                })
                .collect::<Result<Vec<usize>, PixelsError>>()?;
            for (key, values) in table.columns.into_iter().zip(table.values) {
                let mut column = vec![f64::NAN; combined.index.len()];
                for (&row, value) in rows.iter().zip(values) {
                    column[row] = value;
                }
                let mut new_key = Vec::with_capacity(key.len() + 1);
                new_key.push(i);
                new_key.extend(key);
                combined.columns.push(new_key);
                combined.values.push(column);
            }
        }

        Ok(combined)
    }

    /// Writes the table as CSV: one header row per column level, then one row per index value.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), PixelsError> {
        let mut writer = csv::WriterBuilder::new().flexible(true).from_path(path)?;
        for (l, level) in self.levels.iter().enumerate() {
            let mut record = vec![level.clone()];
            record.extend(self.columns.iter().map(|key| key[l].to_string()));
            writer.write_record(&record)?;
        }
        writer.write_record([self.index_name.as_str()])?;
        for (r, x) in self.index.iter().enumerate() {
            let mut record = vec![x.to_string()];
            record.extend(self.values.iter().map(|column| column[r].to_string()));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}
