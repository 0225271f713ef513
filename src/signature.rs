// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! PGP signature verification.

A repository's `Release` is authenticated one of two ways: a detached signature in a
sibling `Release.gpg`, or an inline cleartext signature wrapping `InRelease`. Both are
checked against a caller-supplied public key; this crate never fetches keys itself.
*/

use {
    crate::error::{Error, Result},
    pgp::{types::PublicKeyTrait, Deserializable, SignedPublicKey, StandaloneSignature},
    pgp_cleartext::CleartextSignatureReader,
    std::io::{Cursor, Read},
};

/// Where to load an ASCII-armored public key from.
pub enum KeySource<'a> {
    Path(&'a std::path::Path),
    Bytes(&'a [u8]),
}

/// Parse an ASCII-armored public key.
pub fn load_public_key(source: KeySource) -> Result<SignedPublicKey> {
    let bytes = match source {
        KeySource::Path(path) => {
            std::fs::read(path).map_err(|e| Error::KeyRead(format!("{}: {e}", path.display())))?
        }
        KeySource::Bytes(b) => b.to_vec(),
    };

    let (key, _headers) = SignedPublicKey::from_armor_single(Cursor::new(bytes))
        .map_err(|e| Error::KeyRead(e.to_string()))?;

    Ok(key)
}

/// Verify a detached signature (`Release.gpg`) over `content` (`Release`).
///
/// Returns `Ok(())` if any subkey of `key` produced a valid signature, mirroring
/// `pgpy`'s `key.verify()` semantics of accepting a match from any bound subkey.
pub fn verify_detached(content: &[u8], signature: &[u8], key: &SignedPublicKey) -> Result<()> {
    let (standalone, _headers) = StandaloneSignature::from_armor_single(Cursor::new(signature))
        .or_else(|_| {
            StandaloneSignature::from_bytes(Cursor::new(signature)).map(|sig| (sig, Vec::new()))
        })
        .map_err(Error::Pgp)?;

    if standalone.verify(key, content).is_ok() {
        return Ok(());
    }

    for subkey in &key.public_subkeys {
        if standalone.verify(subkey, content).is_ok() {
            return Ok(());
        }
    }

    Err(Error::Pgp(pgp::errors::Error::Message(
        "detached signature did not verify against the provided key".to_string(),
    )))
}

/// Verify an inline cleartext signature (`InRelease`) and return the enclosed content
/// (the normalized `Release` paragraph text, with dash-escaping reversed).
pub fn verify_cleartext(document: &[u8], key: &SignedPublicKey) -> Result<Vec<u8>> {
    let mut reader = CleartextSignatureReader::new(Cursor::new(document));
    let mut content = Vec::new();
    reader.read_to_end(&mut content)?;

    let signatures = reader.finalize();

    verify_against_key_or_subkeys(&signatures, key)?;

    Ok(content)
}

/// Strip the inline cleartext-signature framing of `InRelease` and return the enclosed
/// content, without checking the signature. Used by hash-only verification, which
/// authenticates nothing and so has no key to check against.
pub fn read_cleartext(document: &[u8]) -> Result<Vec<u8>> {
    let mut reader = CleartextSignatureReader::new(Cursor::new(document));
    let mut content = Vec::new();
    reader.read_to_end(&mut content)?;
    Ok(content)
}

fn verify_against_key_or_subkeys(
    signatures: &pgp_cleartext::CleartextSignatures,
    key: &SignedPublicKey,
) -> Result<()> {
    if signatures.verify(key).is_ok() {
        return Ok(());
    }

    for subkey in &key.public_subkeys {
        if signatures.verify(subkey).is_ok() {
            return Ok(());
        }
    }

    Err(Error::Pgp(pgp::errors::Error::Message(
        "no cleartext signature verified against the provided key".to_string(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_public_key_rejects_garbage() {
        let err = load_public_key(KeySource::Bytes(b"not a key")).unwrap_err();
        assert!(matches!(err, Error::KeyRead(_)));
    }
}
