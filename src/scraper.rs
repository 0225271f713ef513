// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Building the typed [Repository] model by walking a navigator's `dists` tree.

Scraping is deliberately independent of signature verification: a caller that wants
an authenticated scrape runs [crate::verify::verify_repository] first and only
proceeds to scrape on success, rather than this module re-deriving trust decisions.
*/

use {
    crate::{
        error::{Error, Result},
        io::{decompress, Compression},
        model::{Component, FlatSuite, Package, Repository, Suite},
        navigator::Navigator,
        release::{parse_packages, PackagesRecord, ReleaseFile},
        verify::discover_suites,
    },
    std::collections::BTreeMap,
};

fn package_from_record(record: &PackagesRecord, base_url: &str) -> Result<Package> {
    Ok(Package {
        name: record.package()?.to_string(),
        version: record.version()?.to_string(),
        url: format!("{}/{}", base_url.trim_end_matches('/'), record.filename()?),
        size: record.size()?,
        sha256: hex::encode(record.digest(crate::error::HashAlgorithm::Sha256)?.bytes()),
        sha1: hex::encode(record.digest(crate::error::HashAlgorithm::Sha1)?.bytes()),
        md5: hex::encode(record.digest(crate::error::HashAlgorithm::Md5)?.bytes()),
        architecture: record.architecture()?.to_string(),
        date: None,
        section: record.section().map(str::to_string),
        priority: record.priority().map(str::to_string),
        maintainer: record.maintainer().map(str::to_string),
        description: record.description().map(str::to_string),
        description_md5: record.description_md5().map(str::to_string),
        phased_update_percentage: record.phased_update_percentage().map(str::to_string),
    })
}

/// Fetch and parse the `Packages` file an entry's path points to, decompressing it
/// according to its extension.
async fn fetch_packages(
    navigator: &dyn Navigator,
    suite_url: &str,
    path: &str,
) -> Result<Vec<PackagesRecord>> {
    let url = format!("{}/{}", suite_url.trim_end_matches('/'), path);
    let response = navigator.fetcher().fetch(&url).await?;
    let body = decompress(&response.body, Compression::from_path(path)).await?;
    parse_packages(&body)
}

/// Pick the best (preferably uncompressed) `Packages` entry per directory.
fn best_entries_by_directory<'a>(
    paths: impl Iterator<Item = &'a str>,
) -> BTreeMap<String, String> {
    let mut best: BTreeMap<String, String> = BTreeMap::new();

    for path in paths {
        let basename = path.rsplit('/').next().unwrap_or(path);
        if basename != "Packages" && !basename.starts_with("Packages.") {
            continue;
        }

        let dir = path
            .rfind('/')
            .map(|i| path[..i].to_string())
            .unwrap_or_default();

        best.entry(dir)
            .and_modify(|current| {
                if basename == "Packages" {
                    *current = path.to_string();
                }
            })
            .or_insert_with(|| path.to_string());
    }

    best
}

async fn scrape_standard_suite(
    navigator: &dyn Navigator,
    suite_url: &str,
    release: &ReleaseFile,
) -> Result<Suite> {
    let entries = release.preferred_entries()?;
    let by_directory = best_entries_by_directory(entries.iter().map(|e| e.path.as_str()));

    let mut components: BTreeMap<String, Vec<Package>> = BTreeMap::new();

    for (dir, path) in &by_directory {
        let component = dir.split('/').next().unwrap_or(dir).to_string();
        let records = fetch_packages(navigator, suite_url, path).await?;

        let packages = components.entry(component).or_default();
        for record in &records {
            packages.push(package_from_record(record, suite_url)?);
        }
    }

    Ok(Suite {
        name: release
            .codename()
            .or_else(|| release.suite())
            .unwrap_or_default()
            .to_string(),
        url: suite_url.to_string(),
        architectures: release.architectures(),
        date: release.date_str().map(str::to_string),
        components: components
            .into_iter()
            .map(|(name, packages)| Component {
                url: format!("{}/{}", suite_url.trim_end_matches('/'), name),
                name,
                packages,
            })
            .collect(),
    })
}

async fn scrape_flat_suite(
    navigator: &dyn Navigator,
    suite_url: &str,
    release: &ReleaseFile,
) -> Result<FlatSuite> {
    let entries = release.preferred_entries()?;
    let by_directory = best_entries_by_directory(entries.iter().map(|e| e.path.as_str()));

    let mut package = None;
    for path in by_directory.values() {
        if let Some(record) = fetch_packages(navigator, suite_url, path).await?.first() {
            package = Some(package_from_record(record, suite_url)?);
            break;
        }
    }

    Ok(FlatSuite {
        name: release
            .codename()
            .or_else(|| release.suite())
            .unwrap_or_default()
            .to_string(),
        url: suite_url.to_string(),
        architectures: release.architectures(),
        date: release.date_str().map(str::to_string),
        package: package.ok_or_else(|| {
            Error::ControlParseError(format!("no package record found for flat suite {suite_url}"))
        })?,
    })
}

async fn fetch_release(navigator: &dyn Navigator, suite_url: &str) -> Result<ReleaseFile> {
    let inrelease_url = format!("{}/InRelease", suite_url.trim_end_matches('/'));
    let inrelease = navigator.fetcher().fetch(&inrelease_url).await?;
    if inrelease.is_success() {
        return ReleaseFile::parse(&inrelease.body);
    }

    let release_url = format!("{}/Release", suite_url.trim_end_matches('/'));
    let release = navigator.fetcher().fetch(&release_url).await?;
    ReleaseFile::parse(&release.body)
}

/// Scrape a standard (non-flat) repository: every suite under `dists/` has its own
/// `Release` and one `Packages` index per component/architecture pair.
pub async fn scrape_repository(navigator: &dyn Navigator, base_url: &str) -> Result<Repository> {
    let mut suites = Vec::new();

    for suite_url in discover_suites(navigator).await? {
        let release = fetch_release(navigator, &suite_url).await?;
        suites.push(scrape_standard_suite(navigator, &suite_url, &release).await?);
    }

    Ok(Repository::standard(base_url, suites))
}

/// Scrape a flat repository: a single `Packages` per suite directory, with no
/// per-architecture subdirectories.
pub async fn scrape_flat_repository(
    navigator: &dyn Navigator,
    base_url: &str,
    suite_urls: &[String],
) -> Result<Repository> {
    let mut suites = Vec::new();

    for suite_url in suite_urls {
        let release = fetch_release(navigator, suite_url).await?;
        suites.push(scrape_flat_suite(navigator, suite_url, &release).await?);
    }

    Ok(Repository::flat(base_url, suites))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_entries_prefers_uncompressed() {
        let paths = vec![
            "main/binary-amd64/Packages.gz".to_string(),
            "main/binary-amd64/Packages".to_string(),
            "contrib/binary-amd64/Packages.xz".to_string(),
        ];
        let best = best_entries_by_directory(paths.iter().map(String::as_str));
        assert_eq!(
            best.get("main/binary-amd64"),
            Some(&"main/binary-amd64/Packages".to_string())
        );
        assert_eq!(
            best.get("contrib/binary-amd64"),
            Some(&"contrib/binary-amd64/Packages.xz".to_string())
        );
    }
}
