//! CSV target-list loader
//!
//! Input format: comma-delimited rows with `|` as the quote character,
//! columns `name,url,username,password[,output_dir]`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use thiserror::Error;
use tracing::info;
use url::Url;

/// Errors that abort the load. None of these degrade to an empty list; a run
/// without a usable target list never starts.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Could not read target list {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed target list: {0}")]
    Csv(#[from] csv::Error),

    #[error("Row {row}: expected 4 or 5 fields, found {fields}")]
    BadFormat { row: usize, fields: usize },

    #[error("Row {row}: invalid URL {url:?}: {source}")]
    InvalidUrl {
        row: usize,
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Row {row}: duplicate target name {name:?}")]
    DuplicateName { row: usize, name: String },

    #[error("Target list {0} contains no targets")]
    Empty(PathBuf),
}

/// One firewall device to scrape: a single row of the batch input, with its
/// output directory already resolved.
#[derive(Debug, Clone)]
pub struct Target {
    pub name: String,
    pub url: Url,
    pub username: String,
    pub password: String,
    pub output_dir: PathBuf,
}

/// Resolve where a target's report goes.
///
/// Precedence: global override flag, then the row's own 5th field, then the
/// current working directory.
fn resolve_out_dir(override_dir: Option<&Path>, row_dir: Option<&str>) -> PathBuf {
    if let Some(dir) = override_dir {
        return dir.to_path_buf();
    }

    if let Some(dir) = row_dir {
        let dir = dir.trim();
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }

    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Load the target list at `path`.
///
/// `out_dir_override` is the global output-directory flag; when present it
/// wins over every row's 5th field.
pub fn load_targets(
    path: &Path,
    out_dir_override: Option<&Path>,
) -> Result<Vec<Target>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .quote(b'|')
        .flexible(true)
        .from_reader(file);

    let mut targets = Vec::new();
    let mut seen_names: HashSet<String> = HashSet::new();

    for (idx, record) in reader.records().enumerate() {
        let row = idx + 1;
        let record = record?;

        if record.len() < 4 || record.len() > 5 {
            return Err(LoadError::BadFormat {
                row,
                fields: record.len(),
            });
        }

        let name = record[0].trim().to_string();
        if !seen_names.insert(name.clone()) {
            return Err(LoadError::DuplicateName { row, name });
        }

        let raw_url = record[1].trim();
        let url = Url::parse(raw_url).map_err(|source| LoadError::InvalidUrl {
            row,
            url: raw_url.to_string(),
            source,
        })?;

        let output_dir = resolve_out_dir(out_dir_override, record.get(4));

        targets.push(Target {
            name,
            url,
            username: record[2].to_string(),
            password: record[3].to_string(),
            output_dir,
        });
    }

    if targets.is_empty() {
        return Err(LoadError::Empty(path.to_path_buf()));
    }

    info!("Loaded {} targets from {}", targets.len(), path.display());
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_list(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("targets.csv");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_four_field_row_resolves_to_working_directory() {
        let (_dir, path) = write_list("fw1,https://10.0.0.1,admin,secret1\n");
        let targets = load_targets(&path, None).unwrap();

        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].name, "fw1");
        assert_eq!(targets[0].url.as_str(), "https://10.0.0.1/");
        assert_eq!(targets[0].username, "admin");
        assert_eq!(targets[0].password, "secret1");
        assert_eq!(targets[0].output_dir, std::env::current_dir().unwrap());
    }

    #[test]
    fn test_fifth_field_sets_output_directory() {
        let (_dir, path) = write_list("fw1,https://10.0.0.1,admin,secret1,/srv/reports\n");
        let targets = load_targets(&path, None).unwrap();

        assert_eq!(targets[0].output_dir, PathBuf::from("/srv/reports"));
    }

    #[test]
    fn test_override_wins_over_fifth_field() {
        let (_dir, path) = write_list("fw1,https://10.0.0.1,admin,secret1,/srv/reports\n");
        let targets = load_targets(&path, Some(Path::new("/tmp/out"))).unwrap();

        assert_eq!(targets[0].output_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_quoted_password_keeps_embedded_comma() {
        let (_dir, path) = write_list("fw1,https://10.0.0.1,admin,|pa,ss|\n");
        let targets = load_targets(&path, None).unwrap();

        assert_eq!(targets[0].password, "pa,ss");
    }

    #[test]
    fn test_short_row_fails_whole_load() {
        let (_dir, path) = write_list(
            "fw1,https://10.0.0.1,admin,secret1\nfw2,https://10.0.0.2,admin\n",
        );
        let err = load_targets(&path, None).unwrap_err();

        assert!(matches!(err, LoadError::BadFormat { row: 2, fields: 3 }));
    }

    #[test]
    fn test_long_row_fails_whole_load() {
        let (_dir, path) = write_list("fw1,https://10.0.0.1,admin,secret1,/srv,extra\n");
        let err = load_targets(&path, None).unwrap_err();

        assert!(matches!(err, LoadError::BadFormat { row: 1, fields: 6 }));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_targets(&dir.path().join("absent.csv"), None).unwrap_err();

        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_empty_file_is_an_error() {
        let (_dir, path) = write_list("");
        let err = load_targets(&path, None).unwrap_err();

        assert!(matches!(err, LoadError::Empty(_)));
    }

    #[test]
    fn test_invalid_url_fails_load() {
        let (_dir, path) = write_list("fw1,not a url,admin,secret1\n");
        let err = load_targets(&path, None).unwrap_err();

        assert!(matches!(err, LoadError::InvalidUrl { row: 1, .. }));
    }

    #[test]
    fn test_duplicate_names_fail_load() {
        let (_dir, path) = write_list(
            "fw1,https://10.0.0.1,admin,secret1\nfw1,https://10.0.0.2,admin,secret2\n",
        );
        let err = load_targets(&path, None).unwrap_err();

        assert!(matches!(err, LoadError::DuplicateName { row: 2, .. }));
    }
}
