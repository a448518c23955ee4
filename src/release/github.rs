//! GitHub Releases REST implementation of [`ReleaseHost`].

use super::error::{Error, Result};
use super::host::{Release, ReleaseAsset, ReleaseHost, ReleaseSpec};
use crate::api::{ApiError, RetryPolicy};
use bytes::Bytes;
use reqwest::{Method, StatusCode, header};
use serde::Serialize;
use std::time::Duration;
use url::Url;

/// Public GitHub API endpoint; `GITHUB_API_URL` overrides it on Enterprise.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";
const RELEASES_PER_PAGE: usize = 100;
const MAX_RELEASE_PAGES: usize = 50;

/// Retry settings for release host calls.
pub fn default_retry_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 5,
        backoff_factor: Duration::from_secs(2),
        max_backoff: Duration::from_secs(30),
        request_timeout: Duration::from_secs(60),
    }
}

#[derive(Serialize)]
struct CreateReleaseBody<'a> {
    tag_name: &'a str,
    target_commitish: &'a str,
    name: &'a str,
    body: &'a str,
    draft: bool,
    prerelease: bool,
}

#[derive(Serialize)]
struct PublishReleaseBody<'a> {
    tag_name: &'a str,
    target_commitish: &'a str,
    name: &'a str,
    body: &'a str,
    draft: bool,
    prerelease: bool,
    make_latest: &'a str,
}

/// GitHub repository releases.
#[derive(Debug, Clone)]
pub struct GitHubHost {
    http: reqwest::Client,
    api_base: Url,
    owner: String,
    repo: String,
    token: String,
    retry: RetryPolicy,
}

impl GitHubHost {
    /// Creates a host for `owner/repo`.
    ///
    /// # Arguments
    ///
    /// * `api_base` - API root, usually [`DEFAULT_GITHUB_API_URL`]
    /// * `owner` / `repo` - Repository coordinates
    /// * `token` - Token with `contents: write` permission
    pub fn new(api_base: &str, owner: &str, repo: &str, token: &str) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(Error::MissingToken);
        }
        let mut api_base = Url::parse(api_base)
            .map_err(|e| Error::InvalidConfig(format!("invalid GitHub API URL '{}': {}", api_base, e)))?;
        if !api_base.path().ends_with('/') {
            let path = format!("{}/", api_base.path());
            api_base.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("docupipe-release/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::host("client setup", e))?;

        Ok(Self {
            http,
            api_base,
            owner: owner.to_string(),
            repo: repo.to_string(),
            token: token.trim().to_string(),
            retry: default_retry_policy(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn repo_url(&self, path: &str) -> Result<Url> {
        let full = format!("repos/{}/{}/{}", self.owner, self.repo, path);
        self.api_base
            .join(&full)
            .map_err(|e| Error::InvalidConfig(format!("bad release URL {}: {}", full, e)))
    }

    /// Sends a request with retries. Returns the status and body of any
    /// non-retryable outcome so callers can treat 404 specially.
    async fn send(
        &self,
        operation: &str,
        method: Method,
        url: Url,
        body: Option<(Bytes, &str)>,
    ) -> Result<(StatusCode, Bytes)> {
        let method_str = method.as_str().to_string();
        let url_str = url.to_string();

        let outcome = self
            .retry
            .run(&method_str, &url_str, |_| {
                let mut request = self
                    .http
                    .request(method.clone(), url.clone())
                    .timeout(self.retry.request_timeout)
                    .bearer_auth(&self.token)
                    .header(header::ACCEPT, "application/vnd.github+json")
                    .header("X-GitHub-Api-Version", API_VERSION);
                if let Some((bytes, content_type)) = &body {
                    request = request
                        .header(header::CONTENT_TYPE, *content_type)
                        .body(bytes.clone());
                }
                let method_str = &method_str;
                let url_str = &url_str;

                async move {
                    let response = request
                        .send()
                        .await
                        .map_err(|e| ApiError::transport(method_str, url_str, e))?;
                    let status = response.status();
                    let bytes = response
                        .bytes()
                        .await
                        .map_err(|e| ApiError::transport(method_str, url_str, e))?;
                    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                        return Err(ApiError::status(
                            method_str,
                            url_str,
                            status,
                            String::from_utf8_lossy(&bytes).into_owned(),
                        ));
                    }
                    Ok((status, bytes))
                }
            })
            .await;

        outcome.map_err(|e| Error::host(operation, e))
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        operation: &str,
        method: Method,
        url: Url,
        payload: Option<&impl Serialize>,
    ) -> Result<T> {
        let body = match payload {
            Some(payload) => Some((
                Bytes::from(serde_json::to_vec(payload).map_err(|e| Error::host(operation, e))?),
                "application/json",
            )),
            None => None,
        };
        let (status, bytes) = self.send(operation, method, url, body).await?;
        expect_success(operation, status, &bytes)?;
        serde_json::from_slice(&bytes).map_err(|e| Error::host(operation, format!("unexpected response: {}", e)))
    }

    fn upload_endpoint(&self, release: &Release, name: &str) -> Result<Url> {
        let mut url = match &release.upload_url {
            // "https://uploads.github.com/repos/o/r/releases/1/assets{?name,label}"
            Some(template) => {
                let base = template.split('{').next().unwrap_or(template);
                Url::parse(base).map_err(|e| Error::host("upload asset", format!("bad upload URL: {}", e)))?
            }
            None => self.repo_url(&format!("releases/{}/assets", release.id))?,
        };
        url.query_pairs_mut().append_pair("name", name);
        Ok(url)
    }
}

fn expect_success(operation: &str, status: StatusCode, body: &[u8]) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }
    let text = String::from_utf8_lossy(body);
    let snippet: String = text.chars().take(300).collect();
    Err(Error::host(operation, format!("HTTP {}: {}", status, snippet)))
}

impl ReleaseHost for GitHubHost {
    async fn list_releases(&self) -> Result<Vec<Release>> {
        let mut all = Vec::new();
        for page in 1..=MAX_RELEASE_PAGES {
            let mut url = self.repo_url("releases")?;
            url.query_pairs_mut()
                .append_pair("per_page", &RELEASES_PER_PAGE.to_string())
                .append_pair("page", &page.to_string());
            let batch: Vec<Release> = self
                .send_json("list releases", Method::GET, url, None::<&()>)
                .await?;
            let done = batch.len() < RELEASES_PER_PAGE;
            all.extend(batch);
            if done {
                break;
            }
        }
        Ok(all)
    }

    async fn find_release_by_tag(&self, tag: &str) -> Result<Option<Release>> {
        let url = self.repo_url(&format!("releases/tags/{}", tag))?;
        let (status, bytes) = self.send("find release by tag", Method::GET, url, None).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        expect_success("find release by tag", status, &bytes)?;
        let release: Release = serde_json::from_slice(&bytes)
            .map_err(|e| Error::host("find release by tag", format!("unexpected response: {}", e)))?;
        Ok(Some(release))
    }

    async fn create_draft(&self, spec: &ReleaseSpec) -> Result<Release> {
        let url = self.repo_url("releases")?;
        let payload = CreateReleaseBody {
            tag_name: &spec.tag_name,
            target_commitish: &spec.target_commitish,
            name: &spec.name,
            body: &spec.body,
            draft: true,
            prerelease: false,
        };
        self.send_json("create draft", Method::POST, url, Some(&payload)).await
    }

    async fn upload_asset(&self, release: &Release, name: &str, content_type: &str, body: Bytes) -> Result<ReleaseAsset> {
        let url = self.upload_endpoint(release, name)?;
        let (status, bytes) = self
            .send("upload asset", Method::POST, url, Some((body, content_type)))
            .await?;
        expect_success("upload asset", status, &bytes)?;
        serde_json::from_slice(&bytes).map_err(|e| Error::host("upload asset", format!("unexpected response: {}", e)))
    }

    async fn publish_release(&self, release_id: u64, spec: &ReleaseSpec) -> Result<Release> {
        let url = self.repo_url(&format!("releases/{}", release_id))?;
        let payload = PublishReleaseBody {
            tag_name: &spec.tag_name,
            target_commitish: &spec.target_commitish,
            name: &spec.name,
            body: &spec.body,
            draft: false,
            prerelease: false,
            make_latest: "true",
        };
        self.send_json("publish release", Method::PATCH, url, Some(&payload)).await
    }

    async fn delete_release(&self, release_id: u64) -> Result<()> {
        let url = self.repo_url(&format!("releases/{}", release_id))?;
        let (status, bytes) = self.send("delete release", Method::DELETE, url, None).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        expect_success("delete release", status, &bytes)
    }

    async fn delete_tag(&self, tag: &str) -> Result<()> {
        let url = self.repo_url(&format!("git/refs/tags/{}", tag))?;
        let (status, bytes) = self.send("delete tag", Method::DELETE, url, None).await?;
        // 422 "Reference does not exist"
        if status == StatusCode::NOT_FOUND || status == StatusCode::UNPROCESSABLE_ENTITY {
            return Ok(());
        }
        expect_success("delete tag", status, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> GitHubHost {
        GitHubHost::new(DEFAULT_GITHUB_API_URL, "acme", "desktop", "t0ken").unwrap()
    }

    #[test]
    fn empty_token_is_rejected() {
        assert!(matches!(
            GitHubHost::new(DEFAULT_GITHUB_API_URL, "a", "b", "  "),
            Err(Error::MissingToken)
        ));
    }

    #[test]
    fn repo_urls() {
        assert_eq!(
            host().repo_url("releases/tags/latest").unwrap().as_str(),
            "https://api.github.com/repos/acme/desktop/releases/tags/latest"
        );
        let enterprise = GitHubHost::new("https://ghe.example.com/api/v3", "a", "b", "t").unwrap();
        assert_eq!(
            enterprise.repo_url("releases").unwrap().as_str(),
            "https://ghe.example.com/api/v3/repos/a/b/releases"
        );
    }

    #[test]
    fn upload_url_template_is_expanded() {
        let release = Release {
            id: 7,
            tag_name: "x".into(),
            name: None,
            body: None,
            draft: true,
            prerelease: false,
            target_commitish: "main".into(),
            upload_url: Some("https://uploads.github.com/repos/acme/desktop/releases/7/assets{?name,label}".into()),
            assets: vec![],
        };
        assert_eq!(
            host().upload_endpoint(&release, "docupipe macos.zip").unwrap().as_str(),
            "https://uploads.github.com/repos/acme/desktop/releases/7/assets?name=docupipe+macos.zip"
        );

        let without = Release { upload_url: None, ..release };
        assert_eq!(
            host().upload_endpoint(&without, "a.zip").unwrap().as_str(),
            "https://api.github.com/repos/acme/desktop/releases/7/assets?name=a.zip"
        );
    }

    #[test]
    fn release_json_decodes() {
        let json = r#"{
            "id": 1, "tag_name": "latest", "name": null, "draft": false, "prerelease": false,
            "target_commitish": "main", "upload_url": "https://u/assets{?name,label}",
            "assets": [{"id": 9, "name": "a.zip", "size": 12, "state": "uploaded"}],
            "html_url": "https://github.com/acme/desktop/releases/tag/latest"
        }"#;
        let release: Release = serde_json::from_str(json).unwrap();
        assert_eq!(release.assets[0].size, 12);
        assert_eq!(release.name, None);
    }
}
