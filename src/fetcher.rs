// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! HTTP fetcher with response caching.

A single entry point for all network reads, owned by the top-level operation rather than
a process-wide global. Cache entries are keyed on the URL with any trailing slash
trimmed, so `u` and `u/` resolve to the same cache entry.
*/

use {
    crate::error::Result,
    std::{collections::HashMap, sync::Mutex},
};

/// A cached outcome of fetching a URL: either a status/body pair or an opaque network error
/// message (network errors are not cached across retries, only successful round-trips are).
#[derive(Clone, Debug)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

fn cache_key(url: &str) -> &str {
    url.trim_end_matches('/')
}

/// Caching HTTP client. Owned by the caller of a verification or scrape operation; never a
/// process-wide singleton.
pub struct Fetcher {
    client: reqwest::Client,
    cache: Mutex<HashMap<String, FetchResponse>>,
}

impl Fetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .redirect(reqwest::redirect::Policy::limited(10))
                .build()
                .expect("TLS backend should initialize"),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch a URL, following redirects. The body and status are memoised by normalised URL
    /// for the lifetime of this `Fetcher`.
    pub async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        let key = cache_key(url);

        if let Some(cached) = self.cache.lock().unwrap().get(key) {
            return Ok(cached.clone());
        }

        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        let result = FetchResponse { status, body };
        self.cache
            .lock()
            .unwrap()
            .insert(key.to_string(), result.clone());

        Ok(result)
    }

    /// Drop all cached responses. Tests use this to observe filesystem changes made to the
    /// fixture server after an earlier request already populated the cache.
    pub fn clear_cache(&self) {
        self.cache.lock().unwrap().clear();
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_trims_trailing_slash() {
        assert_eq!(cache_key("http://host/a/"), "http://host/a");
        assert_eq!(cache_key("http://host/a"), "http://host/a");
    }
}
