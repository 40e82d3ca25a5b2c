//! Decoding and validation of multipart uploads.
//!
//! The `file` part is streamed straight into a staged write, so an upload is
//! rejected as soon as it crosses the size limit and nothing is published
//! under a generated name unless every check passed.

use std::fmt;
use std::str::FromStr;

use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use http::StatusCode;
use mime::Mime;
use thiserror::Error;

use crate::storage::{self, Storage, StorageError, StoredFile};

/// Name of the multipart field carrying the file.
pub const FILE_FIELD: &str = "file";

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("No file uploaded")]
    MissingFile,
    #[error("File too large")]
    TooLarge,
    /// The whole request crossed the body limit, whichever part caused it.
    #[error("Request body too large")]
    BodyTooLarge,
    #[error("Invalid file type. Allowed types: {allowed}")]
    DisallowedType { allowed: String },
    #[error("Invalid multipart request: {0}")]
    Malformed(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<MultipartError> for UploadError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            UploadError::BodyTooLarge
        } else {
            UploadError::Malformed(err.body_text())
        }
    }
}

/// MIME types accepted for upload.
#[derive(Debug, Clone, PartialEq)]
pub enum AllowList {
    Any,
    /// Full essences (`image/png`) or type wildcards (`video/*`).
    Only(Vec<Mime>),
}

impl AllowList {
    pub fn images() -> Self {
        AllowList::Only(vec![mime::IMAGE_JPEG, mime::IMAGE_PNG, mime::IMAGE_GIF])
    }

    pub fn permits(&self, candidate: &Mime) -> bool {
        match self {
            AllowList::Any => true,
            AllowList::Only(patterns) => patterns.iter().any(|p| {
                if p.subtype() == mime::STAR {
                    p.type_()
                        .as_str()
                        .eq_ignore_ascii_case(candidate.type_().as_str())
                } else {
                    p.essence_str()
                        .eq_ignore_ascii_case(candidate.essence_str())
                }
            }),
        }
    }
}

impl FromStr for AllowList {
    type Err = mime::FromStrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let entries: Vec<&str> = s
            .split(',')
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .collect();

        if entries.iter().any(|e| *e == "*" || *e == "*/*") {
            return Ok(AllowList::Any);
        }

        entries
            .into_iter()
            .map(str::parse)
            .collect::<Result<Vec<Mime>, _>>()
            .map(AllowList::Only)
    }
}

impl fmt::Display for AllowList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllowList::Any => f.write_str("*"),
            AllowList::Only(patterns) => {
                let names: Vec<&str> = patterns.iter().map(|m| m.essence_str()).collect();
                f.write_str(&names.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadRules {
    pub max_file_size: u64,
    pub allowed_types: AllowList,
}

impl UploadRules {
    /// Checks the declared content type of a file part. A part without one is
    /// treated as `application/octet-stream`.
    pub fn check_type(&self, declared: Option<&str>) -> Result<Mime, UploadError> {
        let disallowed = || UploadError::DisallowedType {
            allowed: self.allowed_types.to_string(),
        };

        let content_type = match declared {
            Some(raw) => raw.parse::<Mime>().map_err(|_| disallowed())?,
            None => mime::APPLICATION_OCTET_STREAM,
        };

        if self.allowed_types.permits(&content_type) {
            Ok(content_type)
        } else {
            Err(disallowed())
        }
    }
}

/// A file accepted and published by [`receive_file`].
#[derive(Debug)]
pub struct AcceptedFile {
    pub stored: StoredFile,
    pub content_type: Mime,
}

/// Reads the `file` part of `multipart`, validates it against `rules` and
/// stores it under a generated name.
pub async fn receive_file(
    multipart: &mut Multipart,
    rules: &UploadRules,
    storage: &dyn Storage,
) -> Result<AcceptedFile, UploadError> {
    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        // A part without a filename is a plain text field.
        let original = field
            .file_name()
            .map(str::to_string)
            .ok_or(UploadError::MissingFile)?;
        let content_type = rules.check_type(field.content_type())?;

        let mut staged = storage.stage().await?;
        while let Some(chunk) = field.chunk().await? {
            if staged.written() + chunk.len() as u64 > rules.max_file_size {
                return Err(UploadError::TooLarge);
            }
            staged.write(&chunk).await?;
        }

        let name = storage::generate_name(Some(&original));
        let stored = staged.commit(&name).await?;

        return Ok(AcceptedFile {
            stored,
            content_type,
        });
    }

    Err(UploadError::MissingFile)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(allowed: &str) -> UploadRules {
        UploadRules {
            max_file_size: 1024,
            allowed_types: allowed.parse().unwrap(),
        }
    }

    #[test]
    fn parse_allow_list() {
        assert_eq!(
            "image/jpeg, image/png,image/gif".parse::<AllowList>().unwrap(),
            AllowList::images()
        );
        assert_eq!("*".parse::<AllowList>().unwrap(), AllowList::Any);
        assert!("not a mime".parse::<AllowList>().is_err());
    }

    #[test]
    fn exact_match_ignores_case_and_params() {
        let rules = rules("image/png");
        assert!(rules.check_type(Some("image/png")).is_ok());
        assert!(rules.check_type(Some("IMAGE/PNG")).is_ok());
        assert!(rules.check_type(Some("image/png; charset=binary")).is_ok());
        assert!(rules.check_type(Some("image/gif")).is_err());
    }

    #[test]
    fn wildcard_subtype() {
        let rules = rules("image/png,video/*");
        assert!(rules.check_type(Some("video/mp4")).is_ok());
        assert!(rules.check_type(Some("video/webm")).is_ok());
        assert!(rules.check_type(Some("audio/mpeg")).is_err());
    }

    #[test]
    fn missing_content_type_is_octet_stream() {
        assert!(rules("image/png").check_type(None).is_err());
        assert_eq!(
            rules("*").check_type(None).unwrap(),
            mime::APPLICATION_OCTET_STREAM
        );
    }

    #[test]
    fn rejection_names_allowed_types() {
        let err = rules("image/jpeg,image/png")
            .check_type(Some("text/html"))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid file type. Allowed types: image/jpeg, image/png"
        );
    }

    #[test]
    fn garbage_content_type_is_rejected() {
        assert!(matches!(
            rules("*").check_type(Some("???")),
            Err(UploadError::DisallowedType { .. })
        ));
    }
}
