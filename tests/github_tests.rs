//! GitHub release host against a stub Releases API.

mod common;

use common::{Request, Response, StubServer, fast_retry};
use docupipe_desktop::release::{
    ArchiveFormat, GitHubHost, Publisher, ReleaseHost, ReleaseNotes, ReleaseSpec, StagedArtifact,
};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const REPO: &str = "/repos/acme/desktop";

#[derive(Default)]
struct FakeGitHub {
    next_id: u64,
    /// Release JSON objects
    releases: Vec<Value>,
    tags: Vec<String>,
}

impl FakeGitHub {
    fn seed(&mut self, tag: &str, draft: bool) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.releases.push(json!({
            "id": id, "tag_name": tag, "name": tag, "draft": draft, "prerelease": false,
            "target_commitish": "old", "assets": [{"id": 1000 + id, "name": "old.zip", "size": 3}]
        }));
        if !draft {
            self.tags.push(tag.to_string());
        }
        id
    }

    fn position(&self, id: u64) -> Option<usize> {
        self.releases.iter().position(|r| r["id"] == id)
    }

    fn handle(&mut self, req: &Request) -> Response {
        let path = req.path.as_str();
        let rest = path.strip_prefix(REPO).unwrap_or(path);
        match (req.method.as_str(), rest) {
            ("GET", "/releases") => {
                if req.query["page"] == "1" {
                    Response::json(Value::Array(self.releases.clone()))
                } else {
                    Response::json(json!([]))
                }
            }
            ("GET", r) if r.starts_with("/releases/tags/") => {
                let tag = &r["/releases/tags/".len()..];
                match self.releases.iter().find(|x| x["tag_name"] == tag && x["draft"] == false) {
                    Some(release) => Response::json(release.clone()),
                    None => Response::status(404),
                }
            }
            ("POST", "/releases") => {
                let body = req.json();
                assert_eq!(body["draft"], true);
                self.next_id += 1;
                let id = self.next_id;
                let release = json!({
                    "id": id, "tag_name": body["tag_name"], "name": body["name"], "body": body["body"],
                    "draft": true, "prerelease": false, "target_commitish": body["target_commitish"],
                    "upload_url": format!("{}/uploads{}/releases/{}/assets{{?name,label}}", req.origin(), REPO, id),
                    "assets": []
                });
                self.releases.push(release.clone());
                Response {
                    status: 201,
                    ..Response::json(release)
                }
            }
            ("POST", r) if path.starts_with("/uploads") && r.ends_with("/assets") => {
                let id: u64 = path.split('/').nth(6).unwrap().parse().unwrap();
                let name = req.query["name"].clone();
                let Some(pos) = self.position(id) else {
                    return Response::status(404);
                };
                self.next_id += 1;
                let asset = json!({"id": self.next_id, "name": name, "size": req.body.len()});
                self.releases[pos]["assets"].as_array_mut().unwrap().push(asset.clone());
                Response {
                    status: 201,
                    ..Response::json(asset)
                }
            }
            ("PATCH", r) if r.starts_with("/releases/") => {
                let id: u64 = r["/releases/".len()..].parse().unwrap();
                let body = req.json();
                assert_eq!(body["make_latest"], "true");
                let Some(pos) = self.position(id) else {
                    return Response::status(404);
                };
                let tag = body["tag_name"].as_str().unwrap().to_string();
                let release = &mut self.releases[pos];
                release["tag_name"] = json!(tag);
                release["draft"] = json!(false);
                release["target_commitish"] = body["target_commitish"].clone();
                let published = release.clone();
                if !self.tags.contains(&tag) {
                    self.tags.push(tag);
                }
                Response::json(published)
            }
            ("DELETE", r) if r.starts_with("/releases/") => {
                let id: u64 = r["/releases/".len()..].parse().unwrap();
                match self.position(id) {
                    Some(pos) => {
                        self.releases.remove(pos);
                        Response::empty(204)
                    }
                    None => Response::status(404),
                }
            }
            ("DELETE", r) if r.starts_with("/git/refs/tags/") => {
                let tag = &r["/git/refs/tags/".len()..];
                match self.tags.iter().position(|t| t == tag) {
                    Some(pos) => {
                        self.tags.remove(pos);
                        Response::empty(204)
                    }
                    None => Response::status(422),
                }
            }
            _ => Response::status(404),
        }
    }
}

async fn fake_github(state: Arc<Mutex<FakeGitHub>>) -> StubServer {
    StubServer::start(move |req| state.lock().unwrap().handle(req)).await
}

fn host(server: &StubServer) -> GitHubHost {
    GitHubHost::new(&server.base_url, "acme", "desktop", "t0ken")
        .unwrap()
        .with_retry(fast_retry())
}

#[tokio::test]
async fn publisher_replaces_latest_over_http() {
    let state = Arc::new(Mutex::new(FakeGitHub::default()));
    let old_id = state.lock().unwrap().seed("latest", false);
    let leftover = state.lock().unwrap().seed("latest-staging-0badf00d", true);
    let server = fake_github(state.clone()).await;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("docupipe-windows.zip");
    std::fs::write(&path, b"PK fresh bundle").unwrap();
    let artifact = StagedArtifact {
        name: "docupipe-windows.zip".into(),
        path,
        size: 15,
        sha256: String::new(),
        format: ArchiveFormat::Zip,
    };
    let notes = ReleaseNotes {
        name: "Latest build".into(),
        body: "Automated windows build".into(),
    };

    let outcome = Publisher::new(&host(&server), "latest")
        .publish(&artifact, &notes, "cafef00d")
        .await
        .unwrap();

    assert_eq!(outcome.replaced, Some(old_id));
    assert_eq!(outcome.swept, vec![leftover]);
    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);

    let state = state.lock().unwrap();
    assert_eq!(state.releases.len(), 1);
    let release = &state.releases[0];
    assert_eq!(release["tag_name"], "latest");
    assert_eq!(release["draft"], false);
    assert_eq!(release["target_commitish"], "cafef00d");
    assert_eq!(release["assets"][0]["name"], "docupipe-windows.zip");
    assert_eq!(release["assets"][0]["size"], 15);
    assert_eq!(state.tags, vec!["latest".to_string()]);

    let upload = server
        .requests()
        .into_iter()
        .find(|r| r.path.starts_with("/uploads"))
        .unwrap();
    assert_eq!(upload.header("content-type"), Some("application/zip"));
    assert_eq!(upload.header("authorization"), Some("Bearer t0ken"));
    assert_eq!(upload.header("x-github-api-version"), Some("2022-11-28"));
    assert_eq!(upload.body, b"PK fresh bundle");
}

#[tokio::test]
async fn missing_release_and_tag_are_not_errors() {
    let state = Arc::new(Mutex::new(FakeGitHub::default()));
    let server = fake_github(state).await;
    let host = host(&server);

    assert!(host.find_release_by_tag("latest").await.unwrap().is_none());
    host.delete_release(42).await.unwrap();
    host.delete_tag("latest").await.unwrap();
}

#[tokio::test]
async fn listing_follows_pages() {
    let pages = AtomicUsize::new(0);
    let server = StubServer::start(move |req| {
        pages.fetch_add(1, Ordering::SeqCst);
        let page: usize = req.query["page"].parse().unwrap();
        let count = if page == 1 { 100 } else { 1 };
        let releases: Vec<Value> = (0..count)
            .map(|i| json!({"id": page * 1000 + i, "tag_name": format!("v{}", i), "draft": false, "prerelease": false}))
            .collect();
        Response::json(Value::Array(releases))
    })
    .await;

    let releases = host(&server).list_releases().await.unwrap();
    assert_eq!(releases.len(), 101);
    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].query["per_page"], "100");
}

#[tokio::test]
async fn server_errors_are_retried() {
    let calls = AtomicUsize::new(0);
    let server = StubServer::start(move |_| {
        if calls.fetch_add(1, Ordering::SeqCst) < 2 {
            Response::status(502)
        } else {
            Response::json(json!({
                "id": 5, "tag_name": "latest-staging-1", "draft": true, "prerelease": false, "assets": []
            }))
        }
    })
    .await;

    let spec = ReleaseSpec {
        tag_name: "latest-staging-1".into(),
        name: "n".into(),
        body: "b".into(),
        target_commitish: "main".into(),
    };
    let draft = host(&server).create_draft(&spec).await.unwrap();
    assert_eq!(draft.id, 5);
    assert_eq!(server.requests().len(), 3);
}

#[tokio::test]
async fn client_errors_fail_without_retry() {
    let server = StubServer::start(|_| Response::status(403)).await;
    let spec = ReleaseSpec {
        tag_name: "x".into(),
        name: "n".into(),
        body: "b".into(),
        target_commitish: "main".into(),
    };

    let err = host(&server).create_draft(&spec).await.unwrap_err();
    assert!(err.to_string().contains("403"), "{}", err);
    assert_eq!(server.requests().len(), 1);
}
