// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end scenarios against the in-memory fixture server: golden-path scrape,
//! tampered-hash rejection, missing non-important files under a warning mode, a
//! forbidden path, and `PredefinedNavigator` parity with `HtmlNavigator`.

mod fixture;

use {
    debian_repo_scrape::{
        error::{HashAlgorithm, IntegrityError},
        io::MultiContentDigest,
        navigator::{predefined::PredefinedNavigator, Navigator},
        verify::{verify_hash_sums, verify_release_signatures, verify_repository, VerificationMode},
        Error, Fetcher, HtmlNavigator,
    },
    fixture::Fixture,
    pgp::{
        crypto::{HashAlgorithm as PgpHashAlgorithm, SymmetricKeyAlgorithm},
        types::{CompressionAlgorithm, SecretKeyTrait},
        KeyType, SecretKeyParamsBuilder, SignedPublicKey, SignedSecretKey,
    },
    smallvec::smallvec,
    std::sync::Arc,
};

fn generate_key() -> (SignedSecretKey, SignedPublicKey) {
    let params = SecretKeyParamsBuilder::default()
        .key_type(KeyType::Rsa(2048))
        .can_sign(true)
        .can_create_certificates(false)
        .primary_user_id("Test Suite <test@example.com>".to_string())
        .preferred_symmetric_algorithms(smallvec![SymmetricKeyAlgorithm::AES256])
        .preferred_hash_algorithms(smallvec![PgpHashAlgorithm::SHA2_256])
        .preferred_compression_algorithms(smallvec![CompressionAlgorithm::ZLIB])
        .build()
        .unwrap();

    let secret = params.generate().unwrap().sign(String::new).unwrap();
    let public = secret.public_key().sign(&secret, String::new).unwrap();
    (secret, public)
}

struct Repo {
    fixture: Fixture,
    key: SignedPublicKey,
}

/// Build a one-suite (`mx`), one-component (`main`), one-architecture (`amd64`)
/// repository fixture with a single package (`poem 1.0`), signed by a freshly
/// generated key.
fn golden_path_repo(tamper_deb: bool) -> Repo {
    let (secret, public) = generate_key();

    let deb_content = b"fake .deb content for poem 1.0".to_vec();
    let deb_digest = MultiContentDigest::compute(&deb_content);

    let packages_content = format!(
        "Package: poem\nVersion: 1.0\nArchitecture: amd64\nFilename: pool/main/p/poem/poem_1.0_amd64.deb\nSize: {}\nMD5sum: {}\nSHA1: {}\nSHA256: {}\n\n",
        deb_content.len(),
        hex::encode(deb_digest.md5.bytes()),
        hex::encode(deb_digest.sha1.bytes()),
        hex::encode(deb_digest.sha256.bytes()),
    )
    .into_bytes();
    let packages_digest = MultiContentDigest::compute(&packages_content);

    let release_content = format!(
        "Suite: mx\nCodename: mx\nArchitectures: amd64\nAcquire-By-Hash: no\nMD5Sum:\n {} {} main/binary-amd64/Packages\nSHA1:\n {} {} main/binary-amd64/Packages\nSHA256:\n {} {} main/binary-amd64/Packages\n",
        hex::encode(packages_digest.md5.bytes()),
        packages_content.len(),
        hex::encode(packages_digest.sha1.bytes()),
        packages_content.len(),
        hex::encode(packages_digest.sha256.bytes()),
        packages_content.len(),
    )
    .into_bytes();

    let inrelease = pgp_cleartext::cleartext_sign(
        &secret,
        String::new,
        PgpHashAlgorithm::SHA2_256,
        std::io::Cursor::new(release_content.clone()),
    )
    .unwrap();

    let mut fixture = Fixture::new();
    fixture.add("dists/mx/Release", release_content);
    fixture.add("dists/mx/InRelease", inrelease.into_bytes());
    fixture.add("dists/mx/main/binary-amd64/Packages", packages_content);
    fixture.add(
        "pool/main/p/poem/poem_1.0_amd64.deb",
        if tamper_deb {
            b"corrupted content".to_vec()
        } else {
            deb_content
        },
    );

    Repo { fixture, key: public }
}

/// Like [golden_path_repo] but with `Acquire-By-Hash: yes` and the `by-hash/<Algo>/<digest>`
/// aliases for the `Packages` index populated under each hash table's directory name.
fn acquire_by_hash_repo(mismatch: bool) -> Repo {
    let (secret, public) = generate_key();

    let deb_content = b"fake .deb content for poem 1.0".to_vec();
    let deb_digest = MultiContentDigest::compute(&deb_content);

    let packages_content = format!(
        "Package: poem\nVersion: 1.0\nArchitecture: amd64\nFilename: pool/main/p/poem/poem_1.0_amd64.deb\nSize: {}\nMD5sum: {}\nSHA1: {}\nSHA256: {}\n\n",
        deb_content.len(),
        hex::encode(deb_digest.md5.bytes()),
        hex::encode(deb_digest.sha1.bytes()),
        hex::encode(deb_digest.sha256.bytes()),
    )
    .into_bytes();
    let packages_digest = MultiContentDigest::compute(&packages_content);

    let release_content = format!(
        "Suite: mx\nCodename: mx\nArchitectures: amd64\nAcquire-By-Hash: yes\nMD5Sum:\n {} {} main/binary-amd64/Packages\nSHA1:\n {} {} main/binary-amd64/Packages\nSHA256:\n {} {} main/binary-amd64/Packages\n",
        hex::encode(packages_digest.md5.bytes()),
        packages_content.len(),
        hex::encode(packages_digest.sha1.bytes()),
        packages_content.len(),
        hex::encode(packages_digest.sha256.bytes()),
        packages_content.len(),
    )
    .into_bytes();

    let inrelease = pgp_cleartext::cleartext_sign(
        &secret,
        String::new,
        PgpHashAlgorithm::SHA2_256,
        std::io::Cursor::new(release_content.clone()),
    )
    .unwrap();

    let mut fixture = Fixture::new();
    fixture.add("dists/mx/Release", release_content);
    fixture.add("dists/mx/InRelease", inrelease.into_bytes());
    fixture.add("dists/mx/main/binary-amd64/Packages", packages_content.clone());
    fixture.add(
        format!(
            "dists/mx/main/binary-amd64/by-hash/MD5Sum/{}",
            hex::encode(packages_digest.md5.bytes())
        ),
        packages_content.clone(),
    );
    fixture.add(
        format!(
            "dists/mx/main/binary-amd64/by-hash/SHA1/{}",
            hex::encode(packages_digest.sha1.bytes())
        ),
        packages_content.clone(),
    );
    fixture.add(
        format!(
            "dists/mx/main/binary-amd64/by-hash/SHA256/{}",
            hex::encode(packages_digest.sha256.bytes())
        ),
        if mismatch {
            b"not the same bytes".to_vec()
        } else {
            packages_content
        },
    );
    fixture.add("pool/main/p/poem/poem_1.0_amd64.deb", deb_content);

    Repo { fixture, key: public }
}

#[tokio::test]
async fn golden_path_verifies_and_scrapes() {
    let repo = golden_path_repo(false);
    let (base_url, _server) = fixture::start(repo.fixture).await;

    let navigator = HtmlNavigator::new(base_url.clone(), Arc::new(Fetcher::new()));
    let report = verify_repository(&navigator, &repo.key, VerificationMode::Strict)
        .await
        .unwrap();
    assert!(report.warnings.is_empty());

    let scraped = debian_repo_scrape::scraper::scrape_repository(&navigator, &base_url)
        .await
        .unwrap();
    let debian_repo_scrape::model::Suites::Standard(suites) = scraped.suites else {
        panic!("expected a standard repository");
    };
    assert_eq!(suites.len(), 1);
    assert_eq!(suites[0].name, "mx");
    assert_eq!(suites[0].components.len(), 1);
    assert_eq!(suites[0].components[0].packages[0].name, "poem");
}

#[tokio::test]
async fn tampered_deb_fails_strict_verification() {
    let repo = golden_path_repo(true);
    let (base_url, _server) = fixture::start(repo.fixture).await;

    let navigator = HtmlNavigator::new(base_url, Arc::new(Fetcher::new()));
    let err = verify_repository(&navigator, &repo.key, VerificationMode::Strict)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Integrity(_)));
}

#[tokio::test]
async fn tampered_deb_is_warned_under_raise_important_only() {
    // A `.deb` is an important file, so even the lenient `raise_important_only`
    // mode raises rather than warns on a bad hash.
    let repo = golden_path_repo(true);
    let (base_url, _server) = fixture::start(repo.fixture).await;

    let navigator = HtmlNavigator::new(base_url, Arc::new(Fetcher::new()));
    let err = verify_repository(&navigator, &repo.key, VerificationMode::RaiseImportantOnly)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Integrity(_)));
}

#[tokio::test]
async fn missing_non_important_entry_warns_under_raise_important_only() {
    let _ = env_logger::try_init();

    let (secret, public) = generate_key();

    let stub_content = b"per-architecture stub Release content".to_vec();
    let stub_digest = MultiContentDigest::compute(&stub_content);

    // Referenced in all three hash tables, so a missing stub warns once per table.
    let release_content = format!(
        "Suite: mx\nCodename: mx\nArchitectures: amd64\nAcquire-By-Hash: no\nMD5Sum:\n {} {} main/binary-amd64/Release\nSHA1:\n {} {} main/binary-amd64/Release\nSHA256:\n {} {} main/binary-amd64/Release\n",
        hex::encode(stub_digest.md5.bytes()),
        stub_content.len(),
        hex::encode(stub_digest.sha1.bytes()),
        stub_content.len(),
        hex::encode(stub_digest.sha256.bytes()),
        stub_content.len(),
    )
    .into_bytes();

    let inrelease = pgp_cleartext::cleartext_sign(
        &secret,
        String::new,
        PgpHashAlgorithm::SHA2_256,
        std::io::Cursor::new(release_content.clone()),
    )
    .unwrap();

    let mut fixture = Fixture::new();
    fixture.add("dists/mx/Release", release_content);
    fixture.add("dists/mx/InRelease", inrelease.into_bytes());
    // The per-architecture `Release` stub every hash table references is never published.

    let (base_url, _server) = fixture::start(fixture).await;
    let navigator = HtmlNavigator::new(base_url, Arc::new(Fetcher::new()));
    let report = verify_repository(&navigator, &public, VerificationMode::RaiseImportantOnly)
        .await
        .unwrap();

    assert_eq!(report.warnings.len(), 3);
    for warning in &report.warnings {
        assert_eq!(warning.file, "main/binary-amd64/Release");
    }
    assert_eq!(
        report.warnings.iter().map(|w| w.algorithm).collect::<Vec<_>>(),
        vec![HashAlgorithm::Md5, HashAlgorithm::Sha1, HashAlgorithm::Sha256]
    );
}

#[tokio::test]
async fn ancillary_files_do_not_disturb_verification() {
    // A per-architecture `Release` file is not referenced by any hash table and is
    // not `is_important`; its presence alongside the suite must not confuse suite
    // discovery or the verification walk.
    let repo = golden_path_repo(false);
    let mut fixture = repo.fixture;
    fixture.add("dists/mx/main/binary-amd64/Release", b"ignored".to_vec());
    let (base_url, _server) = fixture::start(fixture).await;

    let navigator = HtmlNavigator::new(base_url, Arc::new(Fetcher::new()));
    let report = verify_repository(&navigator, &repo.key, VerificationMode::RaiseImportantOnly)
        .await
        .unwrap();
    assert!(report.warnings.is_empty());
}

#[tokio::test]
async fn acquire_by_hash_aliases_are_checked() {
    let repo = acquire_by_hash_repo(false);
    let (base_url, _server) = fixture::start(repo.fixture).await;

    let navigator = HtmlNavigator::new(base_url, Arc::new(Fetcher::new()));
    let report = verify_repository(&navigator, &repo.key, VerificationMode::Strict)
        .await
        .unwrap();
    assert!(report.warnings.is_empty());
}

#[tokio::test]
async fn acquire_by_hash_mismatch_is_fatal_even_under_a_lenient_mode() {
    // The by-hash alias's basename (a bare digest) doesn't match `is_important`, so a
    // policy-routed failure would only warn under `raise_important_only`. An
    // Acquire-By-Hash mismatch must raise regardless.
    let repo = acquire_by_hash_repo(true);
    let (base_url, _server) = fixture::start(repo.fixture).await;

    let navigator = HtmlNavigator::new(base_url, Arc::new(Fetcher::new()));
    let err = verify_repository(&navigator, &repo.key, VerificationMode::RaiseImportantOnly)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Integrity(_)));
}

#[tokio::test]
async fn forbidden_path_surfaces_as_file_request_error() {
    let repo = golden_path_repo(false);
    let (base_url, _server) = fixture::start(repo.fixture).await;

    let fetcher = Fetcher::new();
    let response = fetcher.fetch(&format!("{base_url}forbidden")).await.unwrap();
    assert_eq!(response.status, 403);
}

#[tokio::test]
async fn tampered_release_signature_fails_regardless_of_hash_mode() {
    // Force the detached-signature path (no `InRelease` served) and corrupt
    // `Release.gpg`; `verify_release_signatures` takes no mode at all, so this
    // demonstrates the failure is independent of any `VerificationMode`.
    let repo = golden_path_repo(false);
    let mut fixture = repo.fixture;
    fixture.remove("dists/mx/InRelease");
    fixture.add("dists/mx/Release.gpg", b"not a valid signature".to_vec());

    let (base_url, _server) = fixture::start(fixture).await;
    let navigator = HtmlNavigator::new(base_url, Arc::new(Fetcher::new()));

    let err = verify_release_signatures(&navigator, &repo.key).await.unwrap_err();
    assert!(matches!(err, Error::Pgp(_)));
}

#[tokio::test]
async fn verify_hash_sums_needs_no_key_and_still_catches_a_tampered_deb() {
    let repo = golden_path_repo(true);
    let (base_url, _server) = fixture::start(repo.fixture).await;

    let navigator = HtmlNavigator::new(base_url, Arc::new(Fetcher::new()));
    let err = verify_hash_sums(&navigator, VerificationMode::Strict)
        .await
        .unwrap_err();

    match err {
        Error::Integrity(IntegrityError::HashInvalid { algorithm, .. }) => {
            assert_eq!(algorithm, HashAlgorithm::Md5);
        }
        other => panic!("expected a weakest-algorithm HashInvalid, got {other:?}"),
    }
}

#[tokio::test]
async fn verify_hash_sums_reports_a_missing_deb_mentioned_by_its_packages_index() {
    let repo = golden_path_repo(false);
    let mut fixture = repo.fixture;
    fixture.remove("pool/main/p/poem/poem_1.0_amd64.deb");
    let (base_url, _server) = fixture::start(fixture).await;

    let navigator = HtmlNavigator::new(base_url, Arc::new(Fetcher::new()));
    let err = verify_hash_sums(&navigator, VerificationMode::Strict)
        .await
        .unwrap_err();

    match err {
        Error::Integrity(IntegrityError::FileRequestError {
            file,
            file_mentioned_by,
            ..
        }) => {
            assert!(file.ends_with("poem_1.0_amd64.deb"));
            assert!(file_mentioned_by.unwrap().ends_with("Packages"));
        }
        other => panic!("expected FileRequestError, got {other:?}"),
    }
}

#[tokio::test]
async fn predefined_navigator_matches_html_navigator_outcome() {
    let repo = golden_path_repo(false);
    let (base_url, _server) = fixture::start(repo.fixture).await;

    let fetcher = Arc::new(Fetcher::new());
    let navigator = PredefinedNavigator::new(
        base_url.clone(),
        fetcher.clone(),
        &["mx".to_string()],
    )
    .await
    .unwrap();

    let report = verify_repository(&navigator, &repo.key, VerificationMode::Strict)
        .await
        .unwrap();
    assert!(report.warnings.is_empty());

    assert!(navigator.directions().await.unwrap().contains(&"dists".to_string()));
}
