// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! The scraped repository model.

`Repository`, `Suite`, `FlatSuite`, `Component`, and `Package` are plain `serde`
structs. `Repository::flat` is the discriminant that decides whether `suites`
deserializes as `Standard` or `Flat`.
*/

use serde::{Deserialize, Serialize};

/// A scraped package entry. Fields beyond the ones the hash-verified `Packages`
/// record always carries are optional, since not every repository paragraph sets
/// `Section`/`Priority`/etc.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Package {
    pub name: String,
    pub version: String,
    pub url: String,
    pub size: u64,
    pub sha256: String,
    pub sha1: String,
    pub md5: String,
    pub architecture: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintainer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_md5: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phased_update_percentage: Option<String>,
}

/// A component (e.g. `main`, `contrib`) of a non-flat suite, holding one
/// `binary-<arch>/Packages` worth of packages per architecture it was scraped for.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Component {
    pub name: String,
    pub url: String,
    pub packages: Vec<Package>,
}

/// A suite (e.g. `stable`) of a standard (non-flat) repository.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Suite {
    pub name: String,
    pub url: String,
    pub architectures: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub components: Vec<Component>,
}

/// A suite of a flat repository, where `Packages` lives directly under the suite
/// directory rather than under per-component `binary-<arch>/` subdirectories. A flat
/// suite's `Packages` index is expected to carry exactly one record.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FlatSuite {
    pub name: String,
    pub url: String,
    pub architectures: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub package: Package,
}

/// The two shapes a scraped suite list can take, tagged by [Repository::flat].
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Suites {
    Standard(Vec<Suite>),
    Flat(Vec<FlatSuite>),
}

/// A fully scraped repository.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Repository {
    pub url: String,
    pub suites: Suites,
    pub flat: bool,
}

impl Repository {
    pub fn standard(url: impl Into<String>, suites: Vec<Suite>) -> Self {
        Self {
            url: url.into(),
            suites: Suites::Standard(suites),
            flat: false,
        }
    }

    pub fn flat(url: impl Into<String>, suites: Vec<FlatSuite>) -> Self {
        Self {
            url: url.into(),
            suites: Suites::Flat(suites),
            flat: true,
        }
    }
}
