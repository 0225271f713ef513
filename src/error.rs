// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Error handling. */

use thiserror::Error;

/// The three hash algorithms a Release manifest advertises entries under.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
}

impl HashAlgorithm {
    /// Name of the field in `[In]Release` that holds this digest type.
    ///
    /// Also the directory name used under `by-hash/`.
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Md5 => "MD5Sum",
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
        }
    }

    /// Order in which the verifier walks hash tables: MD5 before SHA1 before SHA256, so a
    /// tampered file is reported under the weakest algorithm that detects it.
    pub fn verification_order() -> [Self; 3] {
        [Self::Md5, Self::Sha1, Self::Sha256]
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Repository-integrity failures, as distinct from usage errors.
#[derive(Debug, Error)]
pub enum IntegrityError {
    #[error("Could not find dists folder in repository base")]
    NoDistsPath,

    #[error("File {file} could not be requested from the repository - Status Code: {status}{}",
        file_mentioned_by.as_deref().map(|m| format!(", mentioned in {m}")).unwrap_or_default())]
    FileRequestError {
        file: String,
        status: u16,
        file_mentioned_by: Option<String>,
    },

    #[error("{algorithm} of {file} mentioned in {file_mentioned_by} is invalid")]
    HashInvalid {
        file: String,
        file_mentioned_by: String,
        algorithm: HashAlgorithm,
    },
}

/// Primary crate error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error("{0} is not a valid item for navigation")]
    InvalidDirection(String),

    #[error("{0} is not a valid verification mode")]
    InvalidVerificationMode(String),

    #[error("no checkpoint to restore")]
    InvalidCheckpoint,

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("hex parsing error: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("control file parse error: {0}")]
    ControlParseError(String),

    #[error("expected 1 paragraph in control file; got {0}")]
    ReleaseControlParagraphMismatch(usize),

    #[error("required field missing in control file: {0}")]
    ControlRequiredFieldMissing(&'static str),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("PGP error: {0:?}")]
    Pgp(#[from] pgp::errors::Error),

    #[error("could not read key material: {0}")]
    KeyRead(String),

    #[error("unknown compression extension: {0}")]
    UnknownCompression(String),
}

/// Result wrapper for this crate.
pub type Result<T> = std::result::Result<T, Error>;
