// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Navigator backed by Apache-style autoindex HTML listings. */

use {
    crate::{
        error::Result,
        fetcher::Fetcher,
        navigator::{Navigator, NavigatorState},
    },
    async_trait::async_trait,
    scraper::{Html, Selector},
    std::sync::Arc,
};

/// Navigates a repository by fetching the current directory's HTML listing and
/// parsing the anchor tags inside its `<pre>` block, the layout Apache's
/// `mod_autoindex` (and this crate's test fixture) produce.
pub struct HtmlNavigator {
    state: NavigatorState,
    fetcher: Arc<Fetcher>,
}

impl HtmlNavigator {
    pub fn new(base_url: impl Into<String>, fetcher: Arc<Fetcher>) -> Self {
        Self {
            state: NavigatorState::new(base_url),
            fetcher,
        }
    }
}

#[async_trait]
impl Navigator for HtmlNavigator {
    fn state(&self) -> &NavigatorState {
        &self.state
    }

    fn fetcher(&self) -> &Fetcher {
        self.fetcher.as_ref()
    }

    async fn parse_directions(&self) -> Result<Vec<String>> {
        let url = self.current_url();
        let response = self.fetcher.fetch(&url).await?;

        if !response.is_success() {
            return Ok(Vec::new());
        }

        let body = String::from_utf8_lossy(&response.body).into_owned();
        let document = Html::parse_document(&body);

        let pre_selector = Selector::parse("pre").unwrap();
        let anchor_selector = Selector::parse("a").unwrap();

        let Some(pre) = document.select(&pre_selector).next() else {
            return Ok(Vec::new());
        };

        Ok(pre
            .select(&anchor_selector)
            .map(|a| a.text().collect::<String>().trim().to_string())
            .filter(|text| !text.is_empty() && text != "..")
            .collect())
    }
}
