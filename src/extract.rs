//! Reading insert records from CSV or JSON files.
//!
//! A source is either one file or a directory scanned with glob patterns.
//! Every file becomes one `Vec` of records; loading chunks them into INSERT
//! statements of at most `chunk_size` rows.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use log::{debug, info};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::constants::{ARCHIVE_DIR, DEFAULT_BATCH_SIZE};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("source path {0} does not exist")]
    MissingSource(PathBuf),

    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("delimiter `{0}` is not a single ASCII character")]
    InvalidDelimiter(String),

    #[error("invalid file pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ExtractError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        ExtractError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FileType {
    Csv,
    Json,
}

impl FileType {
    /// Guesses the type from a file extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("csv") {
            Some(FileType::Csv)
        } else if ext.eq_ignore_ascii_case("json") {
            Some(FileType::Json)
        } else {
            None
        }
    }

    fn default_pattern(self) -> &'static str {
        match self {
            FileType::Csv => "*.csv",
            FileType::Json => "*.json",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub source_path: PathBuf,
    pub file_type: FileType,
    /// Rows per INSERT statement.
    pub chunk_size: usize,
    pub delimiter: u8,
    pub has_headers: bool,
    /// Glob patterns applied when `source_path` is a directory. Empty means
    /// every file of `file_type`.
    pub file_patterns: Vec<String>,
    /// Move each file to `<parent of source_path>/archive/` once loaded.
    pub archive_processed: bool,
}

impl ExtractionConfig {
    pub fn new(source_path: impl Into<PathBuf>, file_type: FileType) -> Self {
        ExtractionConfig {
            source_path: source_path.into(),
            file_type,
            chunk_size: DEFAULT_BATCH_SIZE,
            delimiter: b',',
            has_headers: true,
            file_patterns: Vec::new(),
            archive_processed: false,
        }
    }

    pub fn validate(&self) -> Result<(), ExtractError> {
        if !self.source_path.exists() {
            return Err(ExtractError::MissingSource(self.source_path.clone()));
        }
        if self.chunk_size == 0 {
            return Err(ExtractError::InvalidChunkSize);
        }
        Ok(())
    }

    /// Files to load, sorted by path so repeated runs see the same order.
    pub fn source_files(&self) -> Result<Vec<PathBuf>, ExtractError> {
        self.validate()?;
        if self.source_path.is_file() {
            return Ok(vec![self.source_path.clone()]);
        }

        let patterns = if self.file_patterns.is_empty() {
            vec![self.file_type.default_pattern().to_string()]
        } else {
            self.file_patterns.clone()
        };

        let mut files = Vec::new();
        for pattern in patterns {
            let full = self.source_path.join(&pattern);
            let entries = glob::glob(&full.to_string_lossy())
                .map_err(|source| ExtractError::Pattern { pattern, source })?;
            for entry in entries {
                let path = entry.map_err(|e| {
                    let path = e.path().to_path_buf();
                    ExtractError::io(&path, e.into_error())
                })?;
                if path.is_file() {
                    files.push(path);
                }
            }
        }
        files.sort();
        files.dedup();

        debug!("{} files under {}", files.len(), self.source_path.display());
        Ok(files)
    }

    pub fn read<T: DeserializeOwned>(&self, path: &Path) -> Result<Vec<T>, ExtractError> {
        match self.file_type {
            FileType::Csv => self.read_csv(path),
            FileType::Json => read_json(path),
        }
    }

    fn read_csv<T: DeserializeOwned>(&self, path: &Path) -> Result<Vec<T>, ExtractError> {
        let csv_err = |source| ExtractError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(self.has_headers)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(csv_err)?;

        reader
            .deserialize::<T>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(csv_err)
    }

    /// Moves a loaded file into the archive directory, creating it on first use.
    pub fn archive(&self, path: &Path) -> Result<PathBuf, ExtractError> {
        let dir = self
            .source_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(ARCHIVE_DIR);
        fs::create_dir_all(&dir).map_err(|e| ExtractError::io(&dir, e))?;

        let Some(name) = path.file_name() else {
            return Err(ExtractError::MissingSource(path.to_path_buf()));
        };
        let target = dir.join(name);
        fs::rename(path, &target).map_err(|e| ExtractError::io(path, e))?;

        info!("archived {} to {}", path.display(), target.display());
        Ok(target)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, ExtractError> {
    let file = File::open(path).map_err(|e| ExtractError::io(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| ExtractError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Accepts one ASCII character, or `tab` / `\t`.
pub fn parse_delimiter(value: &str) -> Result<u8, ExtractError> {
    match value {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        v if v.len() == 1 && v.is_ascii() => Ok(v.as_bytes()[0]),
        v => Err(ExtractError::InvalidDelimiter(v.to_string())),
    }
}

/// What was read from one source file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetadata {
    pub file_name: String,
    pub file_size: u64,
    pub extracted_at: DateTime<Utc>,
    pub row_count: usize,
}

impl FileMetadata {
    pub fn new(path: &Path, row_count: usize) -> Result<Self, ExtractError> {
        let file_size = fs::metadata(path)
            .map_err(|e| ExtractError::io(path, e))?
            .len();
        Ok(FileMetadata {
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            file_size,
            extracted_at: Utc::now(),
            row_count,
        })
    }
}
