//! Target format catalog.
//!
//! Maps a target format to its file extension, the format code understood by
//! the automation engine's `SaveAs` call, and the set of input extensions the
//! conversion accepts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// A conversion target format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetFormat {
    /// Portable Document Format.
    Pdf,
    /// HWPX (OWPML, the XML-based Hangul document format).
    Hwpx,
}

impl TargetFormat {
    /// Returns the output file extension for this format (without the dot).
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Hwpx => "hwpx",
        }
    }

    /// Returns the format code passed to the engine's `SaveAs` call.
    pub fn engine_code(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Hwpx => "HWPX",
        }
    }

    /// Returns the input extensions this conversion accepts.
    ///
    /// HWPX output only accepts legacy `.hwp` inputs; converting an `.hwpx`
    /// file onto itself is pointless.
    pub fn input_extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Pdf => &["hwp", "hwpx"],
            Self::Hwpx => &["hwp"],
        }
    }

    /// Whether `path` has an extension this conversion accepts.
    ///
    /// The comparison is case-insensitive; files without an extension never
    /// match.
    pub fn accepts_input(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let ext = ext.to_ascii_lowercase();
        self.input_extensions().iter().any(|e| *e == ext)
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.engine_code())
    }
}

impl FromStr for TargetFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PDF" => Ok(Self::Pdf),
            "HWPX" => Ok(Self::Hwpx),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

/// Error for an unrecognized format identifier.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Unknown target format: {0}")]
pub struct UnknownFormat(pub String);

/// A single catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSpec {
    /// The format identifier.
    pub id: TargetFormat,
    /// Output file extension (without the dot).
    pub extension: &'static str,
    /// Format code understood by the engine.
    pub engine_code: &'static str,
}

const CATALOG: &[FormatSpec] = &[
    FormatSpec {
        id: TargetFormat::Pdf,
        extension: "pdf",
        engine_code: "PDF",
    },
    FormatSpec {
        id: TargetFormat::Hwpx,
        extension: "hwpx",
        engine_code: "HWPX",
    },
];

/// Returns the static format catalog.
pub fn catalog() -> &'static [FormatSpec] {
    CATALOG
}
