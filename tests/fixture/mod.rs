// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! An in-memory HTTP fixture server for the e2e tests: `Release`/`InRelease`/
//! `Release.gpg` are served raw, `forbidden` 403s, directories get an
//! Apache-autoindex-style listing, and everything else is served as
//! `application/octet-stream`.

use {
    hyper::{
        service::{make_service_fn, service_fn},
        Body, Request, Response, Server, StatusCode,
    },
    std::{collections::BTreeMap, convert::Infallible, net::SocketAddr, sync::Arc},
    tokio::task::JoinHandle,
};

#[derive(Clone, Default)]
pub struct Fixture {
    files: BTreeMap<String, Vec<u8>>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file at `path` (no leading slash, relative to the fixture's base URL).
    pub fn add(&mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> &mut Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// Remove a previously added file, e.g. to force a navigator down the detached
    /// `Release`/`Release.gpg` signature path by withholding `InRelease`.
    pub fn remove(&mut self, path: &str) -> &mut Self {
        self.files.remove(path);
        self
    }

    fn raw_filenames() -> [&'static str; 3] {
        ["InRelease", "Release", "Release.gpg"]
    }

    /// Direct children of `prefix` (a directory path with no leading/trailing slash,
    /// `""` for the root), in the order Apache autoindex would emit them: directories
    /// are distinguished from files only by whether a deeper file exists under them.
    fn children(&self, prefix: &str) -> Vec<(String, bool)> {
        let mut seen = BTreeMap::new();

        for path in self.files.keys() {
            let Some(rest) = (if prefix.is_empty() {
                Some(path.as_str())
            } else {
                path.strip_prefix(prefix).and_then(|r| r.strip_prefix('/'))
            }) else {
                continue;
            };

            if rest.is_empty() {
                continue;
            }

            match rest.split_once('/') {
                Some((dir, _)) => {
                    seen.insert(dir.to_string(), true);
                }
                None => {
                    seen.entry(rest.to_string()).or_insert(false);
                }
            }
        }

        seen.into_iter().collect()
    }

    fn render_listing(&self, prefix: &str) -> String {
        let mut body = String::from("<html><body><pre>\n");
        if !prefix.is_empty() {
            body.push_str("<a href=\"../\">../</a>\n");
        }
        for (name, is_dir) in self.children(prefix) {
            if is_dir {
                body.push_str(&format!("<a href=\"{name}/\">{name}/</a>\n"));
            } else {
                body.push_str(&format!("<a href=\"{name}\">{name}</a>\n"));
            }
        }
        body.push_str("</pre></body></html>\n");
        body
    }

    fn respond(&self, path: &str) -> Response<Body> {
        let path = path.trim_start_matches('/');

        if path == "forbidden" {
            return Response::builder()
                .status(StatusCode::FORBIDDEN)
                .body(Body::from("forbidden"))
                .unwrap();
        }

        let basename = path.rsplit('/').next().unwrap_or(path);

        if Self::raw_filenames().contains(&basename) {
            return match self.files.get(path) {
                Some(body) => Response::new(Body::from(body.clone())),
                None => Response::builder()
                    .status(StatusCode::NOT_FOUND)
                    .body(Body::empty())
                    .unwrap(),
            };
        }

        if let Some(content) = self.files.get(path) {
            return Response::builder()
                .header("Content-Type", "application/octet-stream")
                .body(Body::from(content.clone()))
                .unwrap();
        }

        let prefix = path.trim_end_matches('/');
        if prefix.is_empty() || self.files.keys().any(|k| k.starts_with(&format!("{prefix}/"))) {
            return Response::builder()
                .header("Content-Type", "text/html")
                .body(Body::from(self.render_listing(prefix)))
                .unwrap();
        }

        Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Body::empty())
            .unwrap()
    }
}

/// Start the fixture server on an ephemeral local port. Returns the `/debian/` base
/// URL and a handle that tears the server down when dropped/aborted.
pub async fn start(fixture: Fixture) -> (String, JoinHandle<()>) {
    let fixture = Arc::new(fixture);

    let make_svc = make_service_fn(move |_conn| {
        let fixture = fixture.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                let fixture = fixture.clone();
                async move { Ok::<_, Infallible>(fixture.respond(req.uri().path())) }
            }))
        }
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let server = Server::bind(&addr).serve(make_svc);
    let local_addr = server.local_addr();

    let handle = tokio::spawn(async move {
        let _ = server.await;
    });

    (format!("http://{local_addr}/"), handle)
}
