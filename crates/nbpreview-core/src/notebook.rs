//! The notebook document model and loader.
//!
//! Notebooks are read in the Jupyter v4 JSON format. Multiline strings
//! (`source`, stream `text`, text MIME entries) may be stored either as one
//! string or as a list of lines; the loader joins them so the rest of the
//! pipeline only sees `String`s.
//!
//! # Failure Modes
//!
//! | Input | Result |
//! |-------|--------|
//! | Unreadable file | [`NotebookError::Io`] |
//! | Malformed JSON | [`NotebookError::Json`] |
//! | Missing `cells`, wrong field types, `nbformat` < 4 | [`NotebookError::InvalidNotebook`] |
//! | Cell without or with an unknown `cell_type` | [`Cell::Unknown`] |
//! | Output with an unknown `output_type` | [`Output::Unknown`] |

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::error::NotebookError;

/// Notebook language used when the metadata names none.
pub const DEFAULT_LANGUAGE: &str = "python";

/// Oldest supported major format version.
const MIN_NBFORMAT: u64 = 4;

#[derive(Deserialize)]
#[serde(untagged)]
enum Multiline {
    One(String),
    Many(Vec<String>),
}

impl Multiline {
    fn join(self) -> String {
        match self {
            Self::One(text) => text,
            Self::Many(lines) => lines.concat(),
        }
    }
}

fn multiline<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Multiline::deserialize(deserializer).map(Multiline::join)
}

/// Whether a MIME type carries structured JSON rather than text.
#[must_use]
pub fn is_json_mime(mime: &str) -> bool {
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

/// An output's MIME type to content mapping.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct MimeBundle(Map<String, Value>);

impl From<Map<String, Value>> for MimeBundle {
    fn from(mut map: Map<String, Value>) -> Self {
        for (mime, value) in &mut map {
            if is_json_mime(mime) {
                continue;
            }
            if let Value::Array(items) = value
                && items.iter().all(Value::is_string)
            {
                let joined: String = items.iter().filter_map(Value::as_str).collect();
                *value = Value::String(joined);
            }
        }
        Self(map)
    }
}

impl MimeBundle {
    #[must_use]
    pub fn get(&self, mime: &str) -> Option<&Value> {
        self.0.get(mime)
    }

    /// The entry for `mime` when it is a string.
    #[must_use]
    pub fn text(&self, mime: &str) -> Option<&str> {
        self.0.get(mime).and_then(Value::as_str)
    }

    #[must_use]
    pub fn contains(&self, mime: &str) -> bool {
        self.0.contains_key(mime)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<const N: usize> From<[(&str, Value); N]> for MimeBundle {
    fn from(entries: [(&str, Value); N]) -> Self {
        entries
            .into_iter()
            .map(|(mime, value)| (mime.to_string(), value))
            .collect::<Map<String, Value>>()
            .into()
    }
}

/// One output of a code cell.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "output_type", rename_all = "snake_case")]
pub enum Output {
    Stream {
        name: String,
        #[serde(default, deserialize_with = "multiline")]
        text: String,
    },
    DisplayData {
        data: MimeBundle,
    },
    ExecuteResult {
        data: MimeBundle,
        #[serde(default)]
        execution_count: Option<i64>,
    },
    Error {
        #[serde(default)]
        traceback: Vec<String>,
    },
    #[serde(other)]
    Unknown,
}

impl Output {
    /// The execution count shown next to this output.
    #[must_use]
    pub fn execution_count(&self) -> Option<i64> {
        match self {
            Self::ExecuteResult {
                execution_count, ..
            } => *execution_count,
            _ => None,
        }
    }

    /// The MIME bundle of rich outputs.
    #[must_use]
    pub fn data(&self) -> Option<&MimeBundle> {
        match self {
            Self::DisplayData { data } | Self::ExecuteResult { data, .. } => Some(data),
            _ => None,
        }
    }
}

/// One notebook cell.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "cell_type", rename_all = "lowercase")]
pub enum Cell {
    Markdown {
        #[serde(deserialize_with = "multiline")]
        source: String,
    },
    Code {
        #[serde(deserialize_with = "multiline")]
        source: String,
        /// `None` when the cell has never run.
        #[serde(default)]
        execution_count: Option<i64>,
        #[serde(default)]
        outputs: Vec<Output>,
    },
    Raw {
        #[serde(deserialize_with = "multiline")]
        source: String,
    },
    #[serde(other)]
    Unknown,
}

impl Cell {
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        match self {
            Self::Markdown { source } | Self::Code { source, .. } | Self::Raw { source } => {
                Some(source)
            }
            Self::Unknown => None,
        }
    }
}

#[derive(Deserialize)]
struct RawNotebook {
    #[serde(default)]
    nbformat: Option<u64>,
    cells: Vec<Value>,
    #[serde(default)]
    metadata: Value,
}

/// A loaded notebook document.
#[derive(Debug, Clone, PartialEq)]
pub struct Notebook {
    pub cells: Vec<Cell>,
    /// Kernel language from `metadata.kernelspec.language`.
    pub language: String,
}

impl Notebook {
    /// Parse a notebook from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, NotebookError> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_value(value)
    }

    /// Read and parse a notebook file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, NotebookError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| NotebookError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_slice(&bytes)
    }

    /// Build a notebook from an already parsed JSON document.
    pub fn from_value(value: Value) -> Result<Self, NotebookError> {
        if !value.is_object() {
            return Err(NotebookError::invalid("top level is not a JSON object"));
        }
        let raw: RawNotebook = serde_json::from_value(value)?;
        if let Some(version) = raw.nbformat
            && version < MIN_NBFORMAT
        {
            return Err(NotebookError::invalid(format!(
                "nbformat {version} is not supported"
            )));
        }

        let cells = raw
            .cells
            .into_iter()
            .map(|cell| {
                if cell.get("cell_type").is_none() {
                    tracing::debug!("cell without cell_type skipped");
                    return Ok(Cell::Unknown);
                }
                serde_json::from_value::<Cell>(cell).map_err(NotebookError::from)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let language = raw
            .metadata
            .pointer("/kernelspec/language")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_LANGUAGE)
            .to_string();

        Ok(Self { cells, language })
    }
}

impl FromStr for Notebook {
    type Err = NotebookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_slice(s.as_bytes())
    }
}
