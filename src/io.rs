// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Content digests and decompression.

Bodies are fetched fully into memory (§5 of the design), so digesting and decompression
operate over owned byte buffers rather than streaming readers.
*/

use {
    crate::error::{Error, HashAlgorithm, Result},
    async_compression::futures::bufread::{BzDecoder, GzipDecoder, LzmaDecoder, XzDecoder},
    futures::{io::Cursor, AsyncReadExt},
    pgp::crypto::Hasher,
    pgp_cleartext::CleartextHasher,
};

/// A parsed content digest, as declared in a Release or Packages entry.
#[derive(Clone, Eq, PartialEq)]
pub enum ContentDigest {
    Md5(Vec<u8>),
    Sha1(Vec<u8>),
    Sha256(Vec<u8>),
}

impl std::fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.algorithm(), hex::encode(self.bytes()))
    }
}

impl ContentDigest {
    pub fn from_hex(algorithm: HashAlgorithm, digest: &str) -> Result<Self> {
        let digest = hex::decode(digest)?;
        Ok(match algorithm {
            HashAlgorithm::Md5 => Self::Md5(digest),
            HashAlgorithm::Sha1 => Self::Sha1(digest),
            HashAlgorithm::Sha256 => Self::Sha256(digest),
        })
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::Md5(v) | Self::Sha1(v) | Self::Sha256(v) => v,
        }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        match self {
            Self::Md5(_) => HashAlgorithm::Md5,
            Self::Sha1(_) => HashAlgorithm::Sha1,
            Self::Sha256(_) => HashAlgorithm::Sha256,
        }
    }

    /// Case-insensitive comparison against a hex digest, as found on the wire.
    pub fn matches_hex(&self, hex_digest: &str) -> bool {
        hex::encode(self.bytes()).eq_ignore_ascii_case(hex_digest.trim())
    }
}

/// All three digests computed over the same content.
#[derive(Clone, Debug)]
pub struct MultiContentDigest {
    pub md5: ContentDigest,
    pub sha1: ContentDigest,
    pub sha256: ContentDigest,
}

impl MultiContentDigest {
    pub fn digest(&self, algorithm: HashAlgorithm) -> &ContentDigest {
        match algorithm {
            HashAlgorithm::Md5 => &self.md5,
            HashAlgorithm::Sha1 => &self.sha1,
            HashAlgorithm::Sha256 => &self.sha256,
        }
    }

    /// Compute all three digests of `data` in a single pass.
    pub fn compute(data: &[u8]) -> Self {
        let mut md5 = Box::new(CleartextHasher::md5()) as Box<dyn Hasher + Send>;
        let mut sha1 = Box::new(CleartextHasher::sha1()) as Box<dyn Hasher + Send>;
        let mut sha256 = Box::new(CleartextHasher::sha256()) as Box<dyn Hasher + Send>;

        md5.update(data);
        sha1.update(data);
        sha256.update(data);

        Self {
            md5: ContentDigest::Md5(md5.finish()),
            sha1: ContentDigest::Sha1(sha1.finish()),
            sha256: ContentDigest::Sha256(sha256.finish()),
        }
    }
}

/// Compression format a file on the wire may be encoded with, keyed by filename extension.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Compression {
    None,
    Gzip,
    Xz,
    Bzip2,
    Lzma,
}

impl Compression {
    /// Classify a path by its extension. `.lzma` and bare `.xz` both map to the LZMA family
    /// per spec §4.E; only `.xz` actually uses the XZ container here for fidelity with the
    /// teacher's container/extension split.
    pub fn from_path(path: &str) -> Self {
        if path.ends_with(".gz") {
            Self::Gzip
        } else if path.ends_with(".xz") {
            Self::Xz
        } else if path.ends_with(".bz2") {
            Self::Bzip2
        } else if path.ends_with(".lzma") {
            Self::Lzma
        } else {
            Self::None
        }
    }
}

/// Decompress a complete buffer, entirely in memory.
pub async fn decompress(data: &[u8], compression: Compression) -> Result<Vec<u8>> {
    let cursor = Cursor::new(data);
    let mut out = Vec::new();

    match compression {
        Compression::None => return Ok(data.to_vec()),
        Compression::Gzip => GzipDecoder::new(cursor).read_to_end(&mut out).await,
        Compression::Xz => XzDecoder::new(cursor).read_to_end(&mut out).await,
        Compression::Bzip2 => BzDecoder::new(cursor).read_to_end(&mut out).await,
        Compression::Lzma => LzmaDecoder::new(cursor).read_to_end(&mut out).await,
    }
    .map_err(Error::Io)?;

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_matches_hex_case_insensitively() {
        let digest = ContentDigest::Md5(vec![0xab, 0xcd]);
        assert!(digest.matches_hex("abcd"));
        assert!(digest.matches_hex("ABCD"));
        assert!(!digest.matches_hex("abce"));
    }

    #[test]
    fn compute_known_md5() {
        let digest = MultiContentDigest::compute(b"hello world");
        assert_eq!(digest.md5.bytes(), hex::decode("5eb63bbbe01eeed093cb22bb8f5acdc3").unwrap());
    }

    #[test]
    fn compression_from_extension() {
        assert_eq!(Compression::from_path("Packages"), Compression::None);
        assert_eq!(Compression::from_path("Packages.gz"), Compression::Gzip);
        assert_eq!(Compression::from_path("Packages.xz"), Compression::Xz);
        assert_eq!(Compression::from_path("Sources.bz2"), Compression::Bzip2);
    }
}
