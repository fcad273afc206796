//! # Store Module
//!
//! CSV persistence for the seen registry and the per-run result set.
//!
//! Every non-numeric field is quoted on write, so delimiters, quotes and
//! newlines inside titles and descriptions survive a round trip.

use std::collections::{ BTreeSet, HashMap };
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use csv::{ QuoteStyle, ReaderBuilder, StringRecord, WriterBuilder };
use serde::Deserialize;
use tracing::{ info, warn };

use crate::dedup::{ merge_by_url, SeenRegistry };
use crate::error::Result;
use crate::posting::{ Posting, COMPANY, DESCRIPTION, JOB_URL, LOCATION, TITLE };

/// Columns persisted for the seen registry.
pub const REGISTRY_COLUMNS: [&str; 4] = [TITLE, COMPANY, LOCATION, JOB_URL];

/// Leading columns of the output file; extras follow in sorted order.
pub const OUTPUT_COLUMNS: [&str; 5] = [TITLE, COMPANY, LOCATION, JOB_URL, DESCRIPTION];

/// What to do with an existing output file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Overwrite it with this run's postings.
    #[default]
    Replace,
    /// Merge this run's postings into it, by url.
    Append,
}

/// Reads postings from a CSV file, `None` if the file does not exist.
///
/// Rows the CSV reader rejects are skipped with a warning.
pub fn read_postings(path: &Path) -> Result<Option<Vec<Posting>>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Ok(None);
        }
        Err(err) => {
            return Err(err.into());
        }
    };

    let mut reader = ReaderBuilder::new().from_reader(file);
    let headers = reader.headers()?.clone();
    let mut postings = Vec::new();
    let mut skipped = 0usize;

    for (index, row) in reader.records().enumerate() {
        match row {
            Ok(record) => postings.push(posting_from_row(&headers, &record)),
            Err(err) => {
                skipped += 1;
                warn!(path = %path.display(), row = index + 1, error = %err, "skipping malformed row");
            }
        }
    }

    if skipped > 0 {
        warn!(path = %path.display(), skipped, "some rows could not be read");
    }
    Ok(Some(postings))
}

/// Loads the seen registry; a missing file yields an empty registry.
pub fn load_registry(path: &Path) -> Result<SeenRegistry> {
    match read_postings(path)? {
        Some(rows) => {
            let registry = SeenRegistry::from_rows(rows);
            info!(path = %path.display(), count = registry.len(), "loaded seen registry");
            Ok(registry)
        }
        None => {
            info!(path = %path.display(), "no seen registry yet, starting empty");
            Ok(SeenRegistry::new())
        }
    }
}

/// Writes the registry's identity columns.
pub fn save_registry(path: &Path, registry: &SeenRegistry) -> Result<()> {
    let columns: Vec<String> = REGISTRY_COLUMNS.iter().map(|c| c.to_string()).collect();
    write_csv(path, &columns, registry.rows())?;
    info!(path = %path.display(), count = registry.len(), "saved seen registry");
    Ok(())
}

/// Writes this run's postings. Does nothing when `postings` is empty.
///
/// # Returns
///
/// The number of rows in the file afterwards, or 0 if nothing was written.
pub fn write_postings(path: &Path, postings: &[Posting], mode: WriteMode) -> Result<usize> {
    if postings.is_empty() {
        info!(path = %path.display(), "no new postings to save");
        return Ok(0);
    }

    let rows = match mode {
        WriteMode::Replace => postings.to_vec(),
        WriteMode::Append => {
            let existing = read_postings(path)?.unwrap_or_default();
            merge_by_url(existing.into_iter().chain(postings.iter().cloned()))
        }
    };

    write_csv(path, &output_columns(&rows), &rows)?;
    info!(path = %path.display(), new = postings.len(), total = rows.len(), ?mode, "saved postings");
    Ok(rows.len())
}

fn output_columns(rows: &[Posting]) -> Vec<String> {
    let extras: BTreeSet<&str> = rows
        .iter()
        .flat_map(|row| row.extra.keys().map(String::as_str))
        .filter(|key| !OUTPUT_COLUMNS.contains(key))
        .collect();

    OUTPUT_COLUMNS.iter()
        .copied()
        .chain(extras)
        .map(String::from)
        .collect()
}

fn write_csv(path: &Path, columns: &[String], rows: &[Posting]) -> Result<()> {
    let mut writer = WriterBuilder::new().quote_style(QuoteStyle::NonNumeric).from_path(path)?;

    writer.write_record(columns)?;
    for row in rows {
        writer.write_record(columns.iter().map(|column| cell(row, column)))?;
    }
    writer.flush()?;
    Ok(())
}

fn cell<'a>(posting: &'a Posting, column: &str) -> &'a str {
    let value = match column {
        TITLE => &posting.title,
        COMPANY => &posting.company,
        LOCATION => &posting.location,
        DESCRIPTION => &posting.description,
        JOB_URL => &posting.url,
        other => {
            return posting.extra.get(other).map(String::as_str).unwrap_or("");
        }
    };
    value.as_deref().unwrap_or("")
}

fn posting_from_row(headers: &StringRecord, row: &StringRecord) -> Posting {
    let mut fields: HashMap<&str, &str> = headers.iter().zip(row.iter()).collect();
    let mut take = |name: &str| {
        fields
            .remove(name)
            .filter(|value| !value.is_empty())
            .map(String::from)
    };

    let mut posting = Posting {
        title: take(TITLE),
        company: take(COMPANY),
        location: take(LOCATION),
        description: take(DESCRIPTION),
        url: take(JOB_URL),
        ..Default::default()
    };

    for (key, value) in fields {
        if !value.is_empty() {
            posting.extra.insert(key.to_string(), value.to_string());
        }
    }
    posting
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn posting(url: &str, title: &str) -> Posting {
        Posting {
            title: Some(title.into()),
            company: Some("Acme".into()),
            location: Some("NYC".into()),
            url: Some(url.into()),
            ..Default::default()
        }
    }

    #[test]
    fn missing_registry_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = load_registry(&dir.path().join("seen.csv")).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn registry_round_trips_identity_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.csv");
        let mut row = posting("https://jobs.example/1", "Eng");
        row.description = Some("not persisted in the registry".into());
        let registry = SeenRegistry::from_rows(vec![row]);

        save_registry(&path, &registry).unwrap();
        let loaded = load_registry(&path).unwrap();

        assert_eq!(loaded.rows(), &[posting("https://jobs.example/1", "Eng")]);
        let header = fs::read_to_string(&path).unwrap();
        assert!(header.starts_with("\"title\",\"company\",\"location\",\"job_url\""));
    }

    #[test]
    fn legacy_url_only_registry_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.csv");
        fs::write(&path, "\"job_url\"\n\"https://a\"\n\"https://b\"\n").unwrap();

        let registry = load_registry(&path).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains_url("https://b"));
        assert!(registry.rows()[0].fuzzy_id().is_none());
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.csv");
        fs::write(&path, "job_url,title\nhttps://a,Eng\nhttps://b,PM,extra,cells\nhttps://c,QA\n").unwrap();

        let registry = load_registry(&path).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(!registry.contains_url("https://b"));
    }

    #[test]
    fn free_text_with_delimiters_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new_jobs.csv");
        let mut tricky = posting("https://jobs.example/1", "Engineer, \"Platform\"\nTeam");
        tricky.description = Some("Line one,\nline \"two\"\r\n\\ done".into());
        tricky.extra.insert("site".into(), "indeed".into());

        write_postings(&path, &[tricky.clone()], WriteMode::Replace).unwrap();
        let read = read_postings(&path).unwrap().unwrap();

        assert_eq!(read, vec![tricky]);
    }

    #[test]
    fn empty_batch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new_jobs.csv");
        assert_eq!(write_postings(&path, &[], WriteMode::Replace).unwrap(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn replace_overwrites_and_append_merges() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new_jobs.csv");

        write_postings(&path, &[posting("a", "Eng"), posting("b", "PM")], WriteMode::Replace).unwrap();
        write_postings(&path, &[posting("c", "QA")], WriteMode::Replace).unwrap();
        assert_eq!(read_postings(&path).unwrap().unwrap(), vec![posting("c", "QA")]);

        let total = write_postings(
            &path,
            &[posting("c", "QA Lead"), posting("d", "SRE")],
            WriteMode::Append
        ).unwrap();
        assert_eq!(total, 2);
        assert_eq!(
            read_postings(&path).unwrap().unwrap(),
            vec![posting("c", "QA Lead"), posting("d", "SRE")]
        );
    }

    #[test]
    fn extra_columns_are_sorted_after_core_columns() {
        let mut row = posting("a", "Eng");
        row.extra.insert("site".into(), "indeed".into());
        row.extra.insert("date_posted".into(), "2024-01-01".into());
        let columns = output_columns(&[row]);
        assert_eq!(
            columns,
            vec!["title", "company", "location", "job_url", "description", "date_posted", "site"]
        );
    }
}
