// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Repository tree navigation.

A [Navigator] is a cursor over a repository's directory tree. It exposes the set of
items reachable from the current position (`directions`), lets a caller step into one
of them (`navigate`), and supports a checkpoint stack so a caller can wander off to
inspect a file and come back to where it started.

This is a single trait with default methods, not a class hierarchy dispatched on
dynamic type: implementors supply only [Navigator::parse_directions]; cursor and
checkpoint bookkeeping live here once.
*/

pub mod html;
pub mod predefined;

use {
    crate::{
        error::{Error, Result},
        fetcher::Fetcher,
    },
    async_trait::async_trait,
    std::sync::Mutex,
};

/// Cursor and checkpoint-stack state shared by every [Navigator] implementation.
#[derive(Debug)]
pub struct NavigatorState {
    base_url: String,
    current_url: Mutex<String>,
    checkpoints: Mutex<Vec<String>>,
}

impl NavigatorState {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            current_url: Mutex::new(base_url.clone()),
            base_url,
            checkpoints: Mutex::new(Vec::new()),
        }
    }

    pub fn current_url(&self) -> String {
        self.current_url.lock().unwrap().clone()
    }

    fn set_current_url(&self, url: String) {
        *self.current_url.lock().unwrap() = url;
    }
}

#[async_trait]
pub trait Navigator: Sync {
    /// Shared cursor/checkpoint state. Every default method operates through this.
    fn state(&self) -> &NavigatorState;

    /// The HTTP fetcher this navigator (and the verifier driving it) reads through.
    fn fetcher(&self) -> &Fetcher;

    /// Parse the set of items reachable from the current position, not including `..`.
    async fn parse_directions(&self) -> Result<Vec<String>>;

    fn base_url(&self) -> &str {
        &self.state().base_url
    }

    fn current_url(&self) -> String {
        self.state().current_url()
    }

    /// The items reachable from the current position. `..` is included iff the
    /// current position is strictly below the repository root, four path segments
    /// deep or more (the `base_url` vs `dists/<suite>/...` depth heuristic).
    async fn directions(&self) -> Result<Vec<String>> {
        let mut items = self.parse_directions().await?;

        let current = self.current_url();
        let depth = current.trim_end_matches('/').matches('/').count();
        if depth > 3 {
            items.push("..".to_string());
        }

        Ok(items)
    }

    /// Step into `item`, which may be a single path segment or several joined by `/`.
    /// A single segment must be one of `directions()`, or this raises
    /// [Error::InvalidDirection]. Multi-segment items apply each segment left to
    /// right and stop silently, without error, at the first hop that doesn't move
    /// the cursor, so a valid prefix followed by a no-op trailing segment succeeds.
    async fn navigate(&self, item: &str) -> Result<()> {
        let item = item.trim_matches('/');

        if item.contains('/') {
            for segment in item.split('/').filter(|s| !s.is_empty()) {
                let before = self.current_url();
                self.navigate(segment).await?;
                if self.current_url() == before {
                    return Ok(());
                }
            }
            return Ok(());
        }

        if !self.directions().await?.iter().any(|d| d == item) {
            return Err(Error::InvalidDirection(item.to_string()));
        }

        let after = self.step(item).await?;
        self.state().set_current_url(after);
        Ok(())
    }

    /// Resolve a single path segment against the current cursor, without validating
    /// that it is one of `directions()` (mirrors the permissiveness of `urljoin`).
    async fn step(&self, segment: &str) -> Result<String> {
        let current = self.current_url();

        if segment == ".." {
            let trimmed = current.trim_end_matches('/');
            return Ok(match trimmed.rfind('/') {
                Some(idx) => format!("{}/", &trimmed[..idx]),
                None => current,
            });
        }

        let base = url::Url::parse(&current).map_err(Error::Url)?;
        let joined = base.join(segment).map_err(Error::Url)?;
        let mut joined = joined.to_string();
        if !joined.ends_with('/') && !segment.contains('.') {
            joined.push('/');
        }
        Ok(joined)
    }

    fn set_checkpoint(&self) {
        self.state()
            .checkpoints
            .lock()
            .unwrap()
            .push(self.current_url());
    }

    fn use_checkpoint(&self) -> Result<()> {
        let checkpoint = self
            .state()
            .checkpoints
            .lock()
            .unwrap()
            .pop()
            .ok_or(Error::InvalidCheckpoint)?;
        self.state().set_current_url(checkpoint);
        Ok(())
    }

    fn clear_checkpoints(&self) {
        self.state().checkpoints.lock().unwrap().clear();
    }

    fn reset(&self) {
        let base = self.state().base_url.clone();
        self.state().set_current_url(base);
        self.clear_checkpoints();
    }

    /// Jump the cursor directly to `url`, bypassing the checkpoint-aware `navigate`.
    /// Used by the verifier's tree traversal, which tracks its own stack of URLs to
    /// visit rather than relying on the single-slot checkpoint.
    fn navigate_to(&self, url: String) {
        self.state().set_current_url(url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedNavigator {
        state: NavigatorState,
        fetcher: Fetcher,
        items: Vec<String>,
    }

    #[async_trait]
    impl Navigator for FixedNavigator {
        fn state(&self) -> &NavigatorState {
            &self.state
        }

        fn fetcher(&self) -> &Fetcher {
            &self.fetcher
        }

        async fn parse_directions(&self) -> Result<Vec<String>> {
            Ok(self.items.clone())
        }
    }

    fn nav(base: &str) -> FixedNavigator {
        FixedNavigator {
            state: NavigatorState::new(base),
            fetcher: Fetcher::new(),
            items: vec!["dists".to_string()],
        }
    }

    #[tokio::test]
    async fn directions_excludes_dotdot_near_root() {
        let navigator = nav("http://localhost:5000/debian/");
        let directions = navigator.directions().await.unwrap();
        assert!(!directions.contains(&"..".to_string()));
    }

    #[tokio::test]
    async fn directions_includes_dotdot_when_deep() {
        let navigator = nav("http://localhost:5000/debian/dists/mx/main/binary-amd64/");
        let directions = navigator.directions().await.unwrap();
        assert!(directions.contains(&"..".to_string()));
    }

    #[tokio::test]
    async fn checkpoint_round_trips() {
        let navigator = nav("http://localhost:5000/debian/");
        navigator.set_checkpoint();
        navigator.navigate("dists").await.unwrap();
        assert!(navigator.current_url().contains("dists"));
        navigator.use_checkpoint().unwrap();
        assert_eq!(navigator.current_url(), "http://localhost:5000/debian/");
    }

    #[tokio::test]
    async fn use_checkpoint_without_set_is_error() {
        let navigator = nav("http://localhost:5000/debian/");
        assert!(matches!(
            navigator.use_checkpoint(),
            Err(Error::InvalidCheckpoint)
        ));
    }
}
