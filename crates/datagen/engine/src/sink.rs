//! Export of generated tables.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use bank_datagen_domain::{
    account::{AccountAuditRecord, CustomerAccountLink},
    customer::CustomerAuditRecord,
    tabular::Tabular,
    transaction::TransactionRecord,
};
use bank_datagen_store::Dataset;

/// Errors raised while exporting a table.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The destination could not be created or written.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// A row has a different number of values than the header.
    #[error("row {row} of {table} has {found} values, expected {expected}")]
    RowWidth {
        /// The destination table.
        table: String,
        /// Zero-based index of the offending row.
        row: usize,
        /// Number of headers.
        expected: usize,
        /// Number of values in the row.
        found: usize,
    },
}

/// A destination for whole tables.
pub trait TabularSink {
    /// Replaces `table` with `headers` followed by `rows`, returning the number of rows
    /// written.
    fn write(
        &mut self,
        table: &str,
        headers: &[&str],
        rows: &[Vec<String>],
    ) -> Result<usize, SinkError>;
}

/// A [`TabularSink`] writing one `<table>.csv` file per table into a directory.
#[derive(Debug, Clone)]
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    /// Creates a sink writing into `dir`, creating the directory if needed.
    pub fn new<P>(dir: P) -> Result<Self, SinkError>
    where
        P: Into<PathBuf>,
    {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        Ok(Self { dir })
    }

    /// Returns the output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl TabularSink for CsvSink {
    #[tracing::instrument(skip(self, headers, rows), fields(rows = rows.len()))]
    fn write(
        &mut self,
        table: &str,
        headers: &[&str],
        rows: &[Vec<String>],
    ) -> Result<usize, SinkError> {
        if let Some((row, values)) =
            rows.iter().enumerate().find(|(_, values)| values.len() != headers.len())
        {
            return Err(SinkError::RowWidth {
                table: table.to_string(),
                row,
                expected: headers.len(),
                found: values.len(),
            });
        }

        let mut writer = csv::Writer::from_path(self.dir.join(format!("{table}.csv")))?;

        writer.write_record(headers)?;
        for values in rows {
            writer.write_record(values)?;
        }
        writer.flush()?;

        Ok(rows.len())
    }
}

/// Writes `records` to the table declared by `T`.
pub fn write_table<K, T>(sink: &mut K, records: &[T]) -> Result<usize, SinkError>
where
    K: TabularSink + ?Sized,
    T: Tabular,
{
    let rows: Vec<_> = records.iter().map(Tabular::row).collect();
    sink.write(T::TABLE, T::HEADERS, &rows)
}

/// Writes every table of `dataset`, returning the row count per table.
pub fn export_dataset<K>(
    sink: &mut K,
    dataset: &Dataset,
) -> Result<BTreeMap<&'static str, usize>, SinkError>
where
    K: TabularSink + ?Sized,
{
    let mut counts = BTreeMap::new();

    counts.insert(CustomerAuditRecord::TABLE, write_table(sink, dataset.customers())?);
    counts.insert(AccountAuditRecord::TABLE, write_table(sink, dataset.accounts())?);
    counts.insert(CustomerAccountLink::TABLE, write_table(sink, dataset.links())?);
    counts.insert(TransactionRecord::TABLE, write_table(sink, dataset.transactions())?);

    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        tables: Vec<(String, usize)>,
    }

    impl TabularSink for RecordingSink {
        fn write(
            &mut self,
            table: &str,
            _headers: &[&str],
            rows: &[Vec<String>],
        ) -> Result<usize, SinkError> {
            self.tables.push((table.to_string(), rows.len()));
            Ok(rows.len())
        }
    }

    #[test]
    fn empty_dataset_still_writes_every_table() {
        let mut sink = RecordingSink::default();

        let counts = export_dataset(&mut sink, &Dataset::default()).unwrap();

        assert_eq!(counts.len(), 4);
        assert!(counts.values().all(|count| *count == 0));
        assert_eq!(sink.tables[0].0, "customer_audit");
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(dir.path()).unwrap();

        let err = sink.write("t", &["a", "b"], &[vec!["1".to_string()]]).unwrap_err();

        assert!(matches!(err, SinkError::RowWidth { row: 0, expected: 2, found: 1, .. }));
    }
}
