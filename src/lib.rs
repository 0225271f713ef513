// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Integrity verification and metadata scraping for Debian-style package repositories.

A repository is walked through a [navigator::Navigator] (either HTML directory
listings or a predefined set of suites), its `Release`/`InRelease` manifests are
authenticated against a caller-supplied PGP key, every referenced file is checked
against its declared digest under a configurable [verify::VerificationMode], and the
package metadata can then be scraped into a typed, JSON-serializable [model::Repository].
*/

pub mod control;
pub mod error;
pub mod exporter;
pub mod fetcher;
pub mod io;
pub mod model;
pub mod navigator;
pub mod release;
pub mod scraper;
pub mod signature;
pub mod verify;

pub use crate::{
    error::{Error, Result},
    exporter::Exporter,
    fetcher::Fetcher,
    model::Repository,
    navigator::{html::HtmlNavigator, predefined::PredefinedNavigator, Navigator},
    verify::{
        verify_hash_sums, verify_release_signatures, verify_repo_integrity, verify_repository,
        VerificationMode,
    },
};
