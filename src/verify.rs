// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Repository integrity verification.

Walks a repository's `dists` tree, authenticates each suite's `Release`/`InRelease`,
and checks every file it references (nested `Packages` indices, and every `.deb` those
indices list) against its declared digest. Failures are routed through a configurable
[VerificationMode] rather than always raising, since large real-world mirrors routinely
have stale or missing optional files.
*/

use {
    crate::{
        error::{Error, IntegrityError, Result},
        io::{decompress, Compression, MultiContentDigest},
        navigator::Navigator,
        release::ReleaseFile,
        signature,
    },
    log::warn,
    pgp::SignedPublicKey,
    std::{collections::HashSet, str::FromStr, sync::Mutex},
};

/// How strictly [verify_repository] treats missing files and bad hashes.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum VerificationMode {
    Strict,
    RaiseImportantOnly,
    IgnoreMissing,
    IgnoreMissingNonImportant,
    VerifyImportantOnly,
    VerifyImportantOnlyIgnoreMissing,
}

impl FromStr for VerificationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "strict" => Self::Strict,
            "raise_important_only" => Self::RaiseImportantOnly,
            "ignore_missing" => Self::IgnoreMissing,
            "ignore_missing_non_important" => Self::IgnoreMissingNonImportant,
            "verify_important_only" => Self::VerifyImportantOnly,
            "verify_important_only_ignore_missing" => Self::VerifyImportantOnlyIgnoreMissing,
            other => return Err(Error::InvalidVerificationMode(other.to_string())),
        })
    }
}

impl std::fmt::Display for VerificationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Strict => "strict",
            Self::RaiseImportantOnly => "raise_important_only",
            Self::IgnoreMissing => "ignore_missing",
            Self::IgnoreMissingNonImportant => "ignore_missing_non_important",
            Self::VerifyImportantOnly => "verify_important_only",
            Self::VerifyImportantOnlyIgnoreMissing => "verify_important_only_ignore_missing",
        };
        f.write_str(s)
    }
}

/// The kind of integrity failure encountered for a single file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FailureKind {
    Missing,
    BadHash,
}

/// What a failure should do, as decided by a [VerificationMode].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Disposition {
    Raise,
    Warn,
    Skip,
    NotVerified,
}

/// A file counts as *important* if it is a package index or a binary package itself;
/// ancillary per-architecture `Release` files and translation files do not.
pub fn is_important(filename: &str) -> bool {
    let basename = filename.rsplit('/').next().unwrap_or(filename);
    basename == "Packages"
        || basename.starts_with("Packages.")
        || basename == "Sources.gz"
        || basename.ends_with(".deb")
}

/// Pure policy dispatch: given a mode, whether the file is important, and the kind of
/// failure observed, decide what to do.
pub fn disposition(mode: VerificationMode, important: bool, failure: FailureKind) -> Disposition {
    use Disposition::*;
    use FailureKind::*;

    match mode {
        VerificationMode::Strict => Raise,

        VerificationMode::RaiseImportantOnly => {
            if important {
                Raise
            } else {
                Warn
            }
        }

        VerificationMode::IgnoreMissing => match failure {
            Missing => Skip,
            BadHash => Raise,
        },

        VerificationMode::IgnoreMissingNonImportant => match (important, failure) {
            (true, _) => Raise,
            (false, Missing) => Skip,
            (false, BadHash) => Raise,
        },

        VerificationMode::VerifyImportantOnly => {
            if important {
                Raise
            } else {
                NotVerified
            }
        }

        VerificationMode::VerifyImportantOnlyIgnoreMissing => {
            if !important {
                NotVerified
            } else {
                match failure {
                    Missing => Skip,
                    BadHash => Raise,
                }
            }
        }
    }
}

/// Join a directory-style URL (expected to end in `/`) and a relative path.
fn join(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Walks `dists/` under the navigator's current position, returning the URL of every
/// directory that contains a `Release` file (a suite root).
pub(crate) async fn discover_suites(navigator: &dyn Navigator) -> Result<Vec<String>> {
    navigator.set_checkpoint();
    navigator.reset();

    if !navigator
        .directions()
        .await?
        .iter()
        .any(|d| d == "dists")
    {
        navigator.use_checkpoint()?;
        return Err(Error::Integrity(IntegrityError::NoDistsPath));
    }
    navigator.navigate("dists").await?;

    let mut suites = Vec::new();
    let mut stack = vec![navigator.current_url()];

    while let Some(url) = stack.pop() {
        navigator.navigate_to(url.clone());
        let directions = navigator.directions().await?;

        if directions.iter().any(|d| d == "Release") {
            suites.push(url);
            continue;
        }

        for item in directions.iter().filter(|d| d.as_str() != "..") {
            navigator.navigate_to(url.clone());
            navigator.navigate(item).await?;
            stack.push(navigator.current_url());
        }
    }

    navigator.use_checkpoint()?;
    Ok(suites)
}

/// One failure surfaced by [verify_repository] under a mode that warns rather than raises.
#[derive(Clone, Debug)]
pub struct VerificationWarning {
    pub file: String,
    pub file_mentioned_by: Option<String>,
    pub failure: FailureKind,
    pub algorithm: crate::error::HashAlgorithm,
}

/// Outcome of a full repository verification pass.
#[derive(Clone, Debug, Default)]
pub struct VerificationReport {
    pub warnings: Vec<VerificationWarning>,
    pub skipped: Vec<String>,
}

struct Context<'a> {
    navigator: &'a dyn Navigator,
    mode: VerificationMode,
    /// Guards entry into nested `Packages`-index parsing, keyed by the index's URL:
    /// a `Packages` file referenced by all three hash tables is hash-checked three
    /// times (once per table) but its `.deb` entries are only walked the first time.
    processed: Mutex<HashSet<String>>,
    report: Mutex<VerificationReport>,
}

impl<'a> Context<'a> {
    fn record_failure(
        &self,
        file: &str,
        file_mentioned_by: Option<&str>,
        failure: FailureKind,
        algorithm: crate::error::HashAlgorithm,
    ) -> Result<()> {
        let important = is_important(file);
        match disposition(self.mode, important, failure) {
            Disposition::Raise => Err(match failure {
                FailureKind::Missing => Error::Integrity(IntegrityError::FileRequestError {
                    file: file.to_string(),
                    status: 404,
                    file_mentioned_by: file_mentioned_by.map(str::to_string),
                }),
                FailureKind::BadHash => Error::Integrity(IntegrityError::HashInvalid {
                    file: file.to_string(),
                    file_mentioned_by: file_mentioned_by.unwrap_or(file).to_string(),
                    algorithm,
                }),
            }),
            Disposition::Warn => {
                warn!(
                    "{algorithm} {} of {} (mentioned by {:?}) failed verification",
                    match failure {
                        FailureKind::Missing => "presence",
                        FailureKind::BadHash => "hash",
                    },
                    file,
                    file_mentioned_by
                );
                self.report.lock().unwrap().warnings.push(VerificationWarning {
                    file: file.to_string(),
                    file_mentioned_by: file_mentioned_by.map(str::to_string),
                    failure,
                    algorithm,
                });
                Ok(())
            }
            Disposition::Skip => {
                self.report.lock().unwrap().skipped.push(file.to_string());
                Ok(())
            }
            Disposition::NotVerified => Ok(()),
        }
    }

    /// Fetch `url` and check its digest, under `algorithm` only, against `expected_hex`.
    /// Returns the decompressed body on success, or `None` if the failure was absorbed
    /// by policy. Not deduplicated by URL: a caller walking all three hash tables calls
    /// this once per table, so a file referenced in all three is fetched (the fetcher's
    /// own cache makes repeat fetches free) and verified three times independently.
    async fn fetch_and_verify(
        &self,
        url: &str,
        relative_path: &str,
        mentioned_by: &str,
        algorithm: crate::error::HashAlgorithm,
        expected_hex: &str,
    ) -> Result<Option<Vec<u8>>> {
        let response = self.navigator.fetcher().fetch(url).await?;
        if !response.is_success() {
            self.record_failure(relative_path, Some(mentioned_by), FailureKind::Missing, algorithm)?;
            return Ok(None);
        }

        let digest = MultiContentDigest::compute(&response.body);
        if !digest.digest(algorithm).matches_hex(expected_hex) {
            self.record_failure(relative_path, Some(mentioned_by), FailureKind::BadHash, algorithm)?;
            return Ok(None);
        }

        let decompressed = decompress(&response.body, Compression::from_path(relative_path)).await?;
        Ok(Some(decompressed))
    }

    /// When a suite's Release advertises `Acquire-By-Hash: yes`, every hashed entry is
    /// also published at `<dir>/by-hash/<Algo>/<digest>`; fetch that alias and assert
    /// it is byte-identical to the entry's canonical path. A mismatch here is always
    /// fatal: it is not subject to the [VerificationMode] policy table.
    async fn verify_by_hash(
        &self,
        suite_url: &str,
        relative_path: &str,
        algorithm: crate::error::HashAlgorithm,
        expected_hex: &str,
        mentioned_by: &str,
    ) -> Result<()> {
        let dir = match relative_path.rsplit_once('/') {
            Some((dir, _)) => format!("{dir}/"),
            None => String::new(),
        };
        let by_hash_path = format!("{dir}by-hash/{}/{expected_hex}", algorithm.field_name());
        let by_hash_url = join(suite_url, &by_hash_path);

        let canonical = self.navigator.fetcher().fetch(&join(suite_url, relative_path)).await?;
        let aliased = self.navigator.fetcher().fetch(&by_hash_url).await?;

        if !aliased.is_success() {
            return Err(Error::Integrity(IntegrityError::FileRequestError {
                file: by_hash_path,
                status: aliased.status,
                file_mentioned_by: Some(mentioned_by.to_string()),
            }));
        }

        if aliased.body != canonical.body {
            return Err(Error::Integrity(IntegrityError::HashInvalid {
                file: by_hash_path,
                file_mentioned_by: mentioned_by.to_string(),
                algorithm,
            }));
        }

        Ok(())
    }
}

/// Fetch and authenticate a suite's `Release`, preferring the inline `InRelease`
/// cleartext signature and falling back to a plain `Release` plus detached
/// `Release.gpg`. Returns the verified manifest bytes and the URL that authenticated
/// them (for error messages naming which file mentioned a later failure).
async fn load_authenticated_release(
    navigator: &dyn Navigator,
    key: &SignedPublicKey,
    suite_url: &str,
) -> Result<(Vec<u8>, String)> {
    let inrelease_url = join(suite_url, "InRelease");
    let release_url = join(suite_url, "Release");

    let inrelease = navigator.fetcher().fetch(&inrelease_url).await?;
    if inrelease.is_success() {
        let content = signature::verify_cleartext(&inrelease.body, key)?;
        return Ok((content, inrelease_url));
    }

    let plain = navigator.fetcher().fetch(&release_url).await?;
    if !plain.is_success() {
        return Err(Error::Integrity(IntegrityError::FileRequestError {
            file: release_url,
            status: plain.status,
            file_mentioned_by: None,
        }));
    }

    let sig_url = join(suite_url, "Release.gpg");
    let sig = navigator.fetcher().fetch(&sig_url).await?;
    if !sig.is_success() {
        return Err(Error::Integrity(IntegrityError::FileRequestError {
            file: sig_url,
            status: sig.status,
            file_mentioned_by: Some(release_url),
        }));
    }

    signature::verify_detached(&plain.body, &sig.body, key)?;
    Ok((plain.body, release_url))
}

/// Fetch a suite's `Release` content without checking any signature, preferring
/// `InRelease` (its cleartext framing is stripped, not verified) and falling back to
/// a plain `Release`. Used by [verify_hash_sums], which has no key to authenticate
/// with; signature checking is [verify_release_signatures]'s job.
async fn load_release_unauthenticated(
    navigator: &dyn Navigator,
    suite_url: &str,
) -> Result<(Vec<u8>, String)> {
    let inrelease_url = join(suite_url, "InRelease");
    let release_url = join(suite_url, "Release");

    let inrelease = navigator.fetcher().fetch(&inrelease_url).await?;
    if inrelease.is_success() {
        let content = signature::read_cleartext(&inrelease.body)?;
        return Ok((content, inrelease_url));
    }

    let plain = navigator.fetcher().fetch(&release_url).await?;
    if !plain.is_success() {
        return Err(Error::Integrity(IntegrityError::FileRequestError {
            file: release_url,
            status: plain.status,
            file_mentioned_by: None,
        }));
    }

    Ok((plain.body, release_url))
}

/// Verify every suite under a navigator's current `dists/` tree: both the
/// `Release`/`InRelease` signature and the hash-table/`Packages`/`.deb` chain.
/// Equivalent to [verify_release_signatures] followed by [verify_hash_sums], but
/// without refetching each suite's manifest for the two passes separately.
pub async fn verify_repository(
    navigator: &dyn Navigator,
    key: &SignedPublicKey,
    mode: VerificationMode,
) -> Result<VerificationReport> {
    let context = Context {
        navigator,
        mode,
        processed: Mutex::new(HashSet::new()),
        report: Mutex::new(VerificationReport::default()),
    };

    for suite_url in discover_suites(navigator).await? {
        let (release_bytes, source_url) = load_authenticated_release(navigator, key, &suite_url).await?;
        verify_suite_hashes(&context, &suite_url, &release_bytes, &source_url).await?;
    }

    navigator.fetcher().clear_cache();
    Ok(context.report.into_inner().unwrap())
}

/// Authenticate every suite's `Release`/`InRelease` signature, regardless of
/// [VerificationMode] (this operation takes no mode: a signature either verifies or
/// it doesn't). Performs no hash-table checking; pair with [verify_hash_sums] for that.
pub async fn verify_release_signatures(navigator: &dyn Navigator, key: &SignedPublicKey) -> Result<()> {
    for suite_url in discover_suites(navigator).await? {
        load_authenticated_release(navigator, key, &suite_url).await?;
    }

    navigator.fetcher().clear_cache();
    Ok(())
}

/// Verify the hash-table/`Packages`/`.deb` chain of every suite, without checking any
/// `Release`/`InRelease` signature (this operation takes no key). Pair with
/// [verify_release_signatures] for signature authentication.
pub async fn verify_hash_sums(navigator: &dyn Navigator, mode: VerificationMode) -> Result<VerificationReport> {
    let context = Context {
        navigator,
        mode,
        processed: Mutex::new(HashSet::new()),
        report: Mutex::new(VerificationReport::default()),
    };

    for suite_url in discover_suites(navigator).await? {
        let (release_bytes, source_url) = load_release_unauthenticated(navigator, &suite_url).await?;
        verify_suite_hashes(&context, &suite_url, &release_bytes, &source_url).await?;
    }

    navigator.fetcher().clear_cache();
    Ok(context.report.into_inner().unwrap())
}

/// Compose [verify_release_signatures] and [verify_hash_sums] into one repository-wide
/// integrity check. Equivalent to [verify_repository].
pub async fn verify_repo_integrity(
    navigator: &dyn Navigator,
    key: &SignedPublicKey,
    mode: VerificationMode,
) -> Result<VerificationReport> {
    verify_repository(navigator, key, mode).await
}

/// Walk one suite's already-authenticated `Release` content: its hash tables, in MD5,
/// then SHA1, then SHA256 order so a tampered file is reported under the weakest
/// algorithm that actually catches it (independent of which table is *preferred* for
/// locating `Packages` entries, SHA256 first, a concern handled in
/// [crate::release::ReleaseFile::preferred_entries]), nested into every `Packages`
/// index and the `.deb` entries it lists.
async fn verify_suite_hashes(
    context: &Context<'_>,
    suite_url: &str,
    release_bytes: &[u8],
    source_url: &str,
) -> Result<()> {
    let release = ReleaseFile::parse(release_bytes)?;
    let important_only = matches!(
        context.mode,
        VerificationMode::VerifyImportantOnly | VerificationMode::VerifyImportantOnlyIgnoreMissing
    );

    for algorithm in crate::error::HashAlgorithm::verification_order() {
        for entry in release.entries(algorithm)? {
            if important_only && !is_important(&entry.path) {
                continue;
            }

            let entry_url = join(suite_url, &entry.path);
            let expected_hex = hex::encode(entry.digest.bytes());

            let Some(body) = context
                .fetch_and_verify(&entry_url, &entry.path, source_url, algorithm, &expected_hex)
                .await?
            else {
                continue;
            };

            if release.acquire_by_hash() {
                context
                    .verify_by_hash(suite_url, &entry.path, algorithm, &expected_hex, source_url)
                    .await?;
            }

            let is_packages_index = entry.path.rsplit('/').next() == Some("Packages")
                || entry.path.contains("Packages.");

            if is_packages_index && context.processed.lock().unwrap().insert(entry_url) {
                verify_packages_index(context, suite_url, &entry.path, &body).await?;
            }
        }
    }

    Ok(())
}

async fn verify_packages_index(
    context: &Context<'_>,
    suite_url: &str,
    index_path: &str,
    body: &[u8],
) -> Result<()> {
    for record in crate::release::parse_packages(body)? {
        let Ok(filename) = record.filename() else {
            continue;
        };

        let deb_url = join(suite_url, filename);

        for algorithm in crate::error::HashAlgorithm::verification_order() {
            let Ok(digest) = record.digest(algorithm) else {
                continue;
            };
            let expected_hex = hex::encode(digest.bytes());

            context
                .fetch_and_verify(&deb_url, filename, index_path, algorithm, &expected_hex)
                .await?;
        }
    }

    Ok(())
}
