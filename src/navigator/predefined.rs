// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Navigator that synthesizes its path set from `Release`/`Packages` manifests
fetched once at construction, rather than parsing HTML listings on every hop.

Given a fixed list of suites, it eagerly fetches each suite's `Release` and every
`Packages` file it references, recording the hash-table filenames and `Packages`'
`Filename` entries so later navigation is pure local lookup with no further requests.
*/

use {
    crate::{
        error::{Error, IntegrityError, Result},
        fetcher::Fetcher,
        navigator::{Navigator, NavigatorState},
        release::{parse_packages, ReleaseFile},
    },
    async_trait::async_trait,
    std::{collections::HashMap, sync::Arc},
};

pub struct PredefinedNavigator {
    state: NavigatorState,
    fetcher: Arc<Fetcher>,
    suites: HashMap<String, Vec<String>>,
    pool: Vec<String>,
}

/// Children of `prefix` among `paths`, i.e. the distinct next path segment after
/// `prefix`, for every path that has `prefix` as a strict ancestor.
fn relative_children(paths: &[String], prefix: &str) -> Vec<String> {
    let mut seen = std::collections::BTreeSet::new();

    for path in paths {
        let Some(rest) = path.strip_prefix(prefix) else {
            continue;
        };
        let rest = rest.trim_start_matches('/');
        if rest.is_empty() {
            continue;
        }
        let segment = rest.split('/').next().unwrap();
        seen.insert(segment.to_string());
    }

    seen.into_iter().collect()
}

impl PredefinedNavigator {
    pub async fn new(
        base_url: impl Into<String>,
        fetcher: Arc<Fetcher>,
        suites: &[String],
    ) -> Result<Self> {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        let mut suites_map = HashMap::new();
        let mut pool = Vec::new();

        for suite in suites {
            let release_url = format!("{base_url}dists/{suite}/Release");
            let response = fetcher.fetch(&release_url).await?;
            if !response.is_success() {
                return Err(Error::Integrity(IntegrityError::FileRequestError {
                    file: release_url,
                    status: response.status,
                    file_mentioned_by: None,
                }));
            }

            let release = ReleaseFile::parse(&response.body)?;
            let entries = release.preferred_entries()?;
            let mut filenames = Vec::new();

            for entry in &entries {
                filenames.push(entry.path.clone());

                if entry.path.ends_with("Packages") {
                    let packages_url = format!("{base_url}dists/{suite}/{}", entry.path);
                    let packages_response = fetcher.fetch(&packages_url).await?;
                    if packages_response.is_success() {
                        for record in parse_packages(&packages_response.body)? {
                            if let Ok(filename) = record.filename() {
                                pool.push(filename.to_string());
                            }
                        }
                    }
                }
            }

            suites_map.insert(suite.clone(), filenames);
        }

        Ok(Self {
            state: NavigatorState::new(base_url),
            fetcher,
            suites: suites_map,
            pool,
        })
    }
}

#[async_trait]
impl Navigator for PredefinedNavigator {
    fn state(&self) -> &NavigatorState {
        &self.state
    }

    fn fetcher(&self) -> &Fetcher {
        self.fetcher.as_ref()
    }

    async fn parse_directions(&self) -> Result<Vec<String>> {
        let base = self.base_url().to_string();
        let current = self.current_url();

        if current == base {
            let mut items = vec!["dists".to_string()];
            if !self.pool.is_empty() {
                items.push("pool".to_string());
            }
            return Ok(items);
        }

        let dists_root = format!("{base}dists/");
        if current == dists_root {
            return Ok(self.suites.keys().cloned().collect());
        }

        if let Some(rest) = current.strip_prefix(&dists_root) {
            let suite = rest.trim_end_matches('/').split('/').next().unwrap_or("");
            if let Some(filenames) = self.suites.get(suite) {
                let sub_prefix = rest
                    .strip_prefix(suite)
                    .unwrap_or("")
                    .trim_start_matches('/');
                return Ok(relative_children(filenames, sub_prefix));
            }
        }

        if let Some(rest) = current.strip_prefix(&base) {
            if rest.starts_with("pool") {
                return Ok(relative_children(&self.pool, rest.trim_end_matches('/')));
            }
        }

        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_children_finds_direct_descendants() {
        let paths = vec![
            "main/binary-amd64/Packages".to_string(),
            "main/binary-armhf/Packages".to_string(),
            "contrib/binary-amd64/Packages".to_string(),
        ];
        let mut children = relative_children(&paths, "");
        children.sort();
        assert_eq!(children, vec!["contrib".to_string(), "main".to_string()]);

        let mut children = relative_children(&paths, "main");
        children.sort();
        assert_eq!(
            children,
            vec!["binary-amd64".to_string(), "binary-armhf".to_string()]
        );
    }
}
