// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Persisting scraped repositories to JSON.

`Exporter` owns a `Vec<Repository>` rather than being one: subclassing a collection
type is an antipattern Rust's lack of implementation inheritance rules out anyway.
*/

use {
    crate::{error::Result, model::Repository},
    std::{
        io::{Read, Write},
        path::Path,
    },
};

/// An in-memory collection of scraped repositories with JSON persistence.
#[derive(Clone, Debug, Default)]
pub struct Exporter {
    repositories: Vec<Repository>,
}

impl Exporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, repository: Repository) {
        self.repositories.push(repository);
    }

    pub fn repositories(&self) -> &[Repository] {
        &self.repositories
    }

    pub fn into_repositories(self) -> Vec<Repository> {
        self.repositories
    }

    /// Serialize to JSON and write to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.save_to(file)
    }

    /// Serialize to JSON and write to an arbitrary writer.
    pub fn save_to(&self, mut writer: impl Write) -> Result<()> {
        let json = serde_json::to_vec_pretty(&self.repositories)?;
        writer.write_all(&json)?;
        Ok(())
    }

    /// Load a previously saved export from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::load_from(file)
    }

    /// Load a previously saved export from an arbitrary reader.
    pub fn load_from(mut reader: impl Read) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        let repositories = serde_json::from_slice(&data)?;
        Ok(Self { repositories })
    }
}
