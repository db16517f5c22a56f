//! Document file handles and the media-type allow-list.
//!
//! A [`DocumentFile`] is what the platform hands over when a user picks or
//! drops a file: a name, a declared media type, and contents that may live in
//! memory or on disk. Contents are only read when the document is hashed, so
//! a file removed after selection surfaces as an I/O error at that point.

use std::fs;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::error::{PrimitivesError, Result};

/// Document kinds accepted for storage and verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[derive(strum::EnumIter, strum::EnumCount, strum::IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum MediaType {
    /// Portable Document Format.
    Pdf,
    /// Legacy Microsoft Word document.
    Doc,
    /// Office Open XML word-processing document.
    Docx,
    /// Plain text.
    PlainText,
}

impl MediaType {
    /// Returns the MIME type string for this media type.
    pub const fn mime(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Doc => "application/msword",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::PlainText => "text/plain",
        }
    }

    /// Looks up an allowed media type by its MIME string.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim();
        [Self::Pdf, Self::Doc, Self::Docx, Self::PlainText]
            .into_iter()
            .find(|t| t.mime().eq_ignore_ascii_case(mime))
    }

    /// Guesses a media type from a file name's extension.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "doc" => Some(Self::Doc),
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::PlainText),
            _ => None,
        }
    }

    /// Checks a file against the allow-list.
    ///
    /// The declared type decides. A file whose declared type is not allowed
    /// is still accepted as a PDF when its name ends in `.pdf`, since some
    /// platforms report an empty type for PDF files.
    pub fn accept(name: &str, declared: &str) -> Result<Self> {
        if let Some(media_type) = Self::from_mime(declared) {
            return Ok(media_type);
        }
        if name.to_ascii_lowercase().ends_with(".pdf") {
            return Ok(Self::Pdf);
        }
        Err(PrimitivesError::UnsupportedFileType {
            name: name.to_owned(),
            media_type: declared.to_owned(),
        })
    }

    /// Returns a short lowercase name (`pdf`, `doc`, `docx`, `plain-text`).
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone)]
enum Contents {
    Memory(Bytes),
    Path(PathBuf),
}

/// A document selected for hashing.
#[derive(Debug, Clone)]
pub struct DocumentFile {
    name: String,
    declared_type: String,
    contents: Contents,
}

impl DocumentFile {
    /// Creates a file handle over in-memory contents.
    pub fn from_bytes(
        name: impl Into<String>,
        declared_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            contents: Contents::Memory(data.into()),
        }
    }

    /// Creates a file handle over a path on disk.
    ///
    /// The declared type is guessed from the extension; unknown extensions
    /// get an empty declared type and are rejected by [`Self::media_type`]
    /// unless they end in `.pdf`.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let declared_type = MediaType::from_file_name(&name)
            .map(|t| t.mime().to_owned())
            .unwrap_or_default();

        Self {
            name,
            declared_type,
            contents: Contents::Path(path),
        }
    }

    /// Returns the file name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the media type the platform declared for the file.
    pub fn declared_type(&self) -> &str {
        &self.declared_type
    }

    /// Checks the file against the media-type allow-list.
    pub fn media_type(&self) -> Result<MediaType> {
        MediaType::accept(&self.name, &self.declared_type)
    }

    /// Returns the content length, reading file metadata for on-disk files.
    pub fn len(&self) -> Result<u64> {
        match &self.contents {
            Contents::Memory(data) => Ok(data.len() as u64),
            Contents::Path(path) => Ok(fs::metadata(path)?.len()),
        }
    }

    /// Returns true if the file has no contents.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Reads the full contents.
    pub fn read(&self) -> Result<Bytes> {
        match &self.contents {
            Contents::Memory(data) => Ok(data.clone()),
            Contents::Path(path) => Ok(Bytes::from(fs::read(path)?)),
        }
    }

    /// Opens the contents for incremental reading.
    pub fn reader(&self) -> Result<Box<dyn Read + '_>> {
        Ok(match &self.contents {
            Contents::Memory(data) => Box::new(&data[..]),
            Contents::Path(path) => Box::new(BufReader::new(fs::File::open(path)?)),
        })
    }
}
