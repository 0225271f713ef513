// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Manifest accessors: Release and Packages control files. */

use crate::{
    control::{parse_single_paragraph, ControlParagraph, ControlParagraphReader},
    error::{Error, HashAlgorithm, Result},
    io::ContentDigest,
};

/// A single row of a Release hash table: a file path relative to the manifest's own
/// directory, its declared size, and its declared digest.
#[derive(Clone, Debug)]
pub struct ReleaseFileEntry {
    pub path: String,
    pub size: u64,
    pub digest: ContentDigest,
}

/// A parsed `Release`/`InRelease` manifest.
#[derive(Clone, Debug)]
pub struct ReleaseFile {
    paragraph: ControlParagraph<'static>,
}

impl ReleaseFile {
    /// Parse the bytes of a `Release` file. Exactly one paragraph is expected.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Ok(Self {
            paragraph: parse_single_paragraph(data)?,
        })
    }

    pub fn suite(&self) -> Option<&str> {
        self.paragraph.field_str("Suite")
    }

    pub fn codename(&self) -> Option<&str> {
        self.paragraph.field_str("Codename")
    }

    pub fn architectures(&self) -> Vec<String> {
        self.paragraph.field_words("Architectures")
    }

    pub fn date_str(&self) -> Option<&str> {
        self.paragraph.field_str("Date")
    }

    pub fn acquire_by_hash(&self) -> bool {
        self.paragraph.field_bool("Acquire-By-Hash")
    }

    /// Whether any of the three hash tables are present.
    pub fn has_any_hash_table(&self) -> bool {
        HashAlgorithm::verification_order()
            .iter()
            .any(|a| self.paragraph.has_field(a.field_name()))
    }

    /// Entries of a given hash table, in the order the Release file declares them.
    pub fn entries(&self, algorithm: HashAlgorithm) -> Result<Vec<ReleaseFileEntry>> {
        let field_name = algorithm.field_name();
        let Some(value) = self.paragraph.field_multiline(field_name) else {
            return Ok(Vec::new());
        };

        let mut entries = Vec::new();
        for line in value.iter_lines() {
            let parts: Vec<&str> = line.split_ascii_whitespace().collect();
            let [digest, size, path] = parts[..] else {
                return Err(Error::ControlParseError(format!(
                    "malformed {field_name} entry: '{line}'"
                )));
            };

            entries.push(ReleaseFileEntry {
                path: path.to_string(),
                size: size
                    .parse()
                    .map_err(|_| Error::ControlParseError(format!("bad size in '{line}'")))?,
                digest: ContentDigest::from_hex(algorithm, digest)?,
            });
        }

        Ok(entries)
    }

    /// The first present hash table among `SHA256, SHA1, MD5Sum`, used by
    /// `get_packages_files` to locate `Packages` entries (a fetch-preference concern,
    /// independent of the verifier's MD5->SHA1->SHA256 verification order).
    pub fn preferred_entries(&self) -> Result<Vec<ReleaseFileEntry>> {
        for algorithm in [HashAlgorithm::Sha256, HashAlgorithm::Sha1, HashAlgorithm::Md5] {
            let entries = self.entries(algorithm)?;
            if !entries.is_empty() {
                return Ok(entries);
            }
        }
        Ok(Vec::new())
    }
}

/// A single record of a `Packages` index.
#[derive(Clone, Debug)]
pub struct PackagesRecord {
    paragraph: ControlParagraph<'static>,
}

impl PackagesRecord {
    pub fn package(&self) -> Result<&str> {
        self.paragraph.required_field_str("Package")
    }

    pub fn version(&self) -> Result<&str> {
        self.paragraph.required_field_str("Version")
    }

    pub fn architecture(&self) -> Result<&str> {
        self.paragraph.required_field_str("Architecture")
    }

    /// Path from the repository root to the `.deb`.
    pub fn filename(&self) -> Result<&str> {
        self.paragraph.required_field_str("Filename")
    }

    pub fn size(&self) -> Result<u64> {
        self.paragraph
            .required_field_str("Size")?
            .parse()
            .map_err(|_| Error::ControlParseError("bad Size field".to_string()))
    }

    pub fn digest(&self, algorithm: HashAlgorithm) -> Result<ContentDigest> {
        let field = match algorithm {
            HashAlgorithm::Md5 => "MD5sum",
            HashAlgorithm::Sha1 => "SHA1",
            HashAlgorithm::Sha256 => "SHA256",
        };
        ContentDigest::from_hex(algorithm, self.paragraph.required_field_str(field)?)
    }

    pub fn section(&self) -> Option<&str> {
        self.paragraph.field_str("Section")
    }

    pub fn priority(&self) -> Option<&str> {
        self.paragraph.field_str("Priority")
    }

    pub fn maintainer(&self) -> Option<&str> {
        self.paragraph.field_str("Maintainer")
    }

    pub fn description(&self) -> Option<&str> {
        self.paragraph.field_str("Description")
    }

    pub fn description_md5(&self) -> Option<&str> {
        self.paragraph.field_str("Description-md5")
    }

    pub fn phased_update_percentage(&self) -> Option<&str> {
        self.paragraph.field_str("Phased-Update-Percentage")
    }
}

/// Parse a `Packages` index (zero or more paragraphs).
pub fn parse_packages(data: &[u8]) -> Result<Vec<PackagesRecord>> {
    ControlParagraphReader::new(std::io::Cursor::new(data))
        .map(|r| r.map(|paragraph| PackagesRecord { paragraph }))
        .collect()
}
