//! GitHub REST implementation of [`HostingApi`].
//!
//! Uses a blocking `reqwest` client; every call is a single round trip and
//! the reconciler never issues two at once.
//!
//! Status mapping:
//! - 404 → `Error::RemoteNotFound`
//! - 409, 422 → `Error::RemoteConflict`
//! - anything else unsuccessful, or a transport failure →
//!   `Error::RemoteUnavailable`

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::debug;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::LINK;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::locator::RepoId;
use crate::repository::{
    FileWrite, HostingApi, NewPullRequest, PullRequestFilter, PullRequestRecord,
    PullRequestState, RemoteFile, RepositoryInfo,
};

/// Public GitHub API endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";
const PAGE_SIZE: usize = 100;
/// Upper bound on `rel="next"` links followed for one listing.
const MAX_PAGES: usize = 1000;

/// Blocking GitHub API client.
pub struct GitHubClient {
    api_base_url: Url,
    token: String,
    user_agent: String,
    http: Client,
}

impl GitHubClient {
    /// Creates a client for `api_base_url` authenticated with `token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty, the base URL is invalid, or
    /// the HTTP client cannot be initialized.
    pub fn new(api_base_url: &str, token: &str, user_agent: &str) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(Error::Config {
                message: "GitHub token is empty".to_string(),
                hint: Some("Set GITHUB_TOKEN or pass --token".to_string()),
            });
        }

        let mut api_base_url = Url::parse(api_base_url.trim())?;
        if !api_base_url.path().ends_with('/') {
            let path = format!("{}/", api_base_url.path());
            api_base_url.set_path(&path);
        }

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::RemoteUnavailable {
                resource: api_base_url.to_string(),
                status: None,
                message: e.to_string(),
            })?;

        Ok(Self {
            api_base_url,
            token: token.to_string(),
            user_agent: user_agent.to_string(),
            http,
        })
    }

    /// Absolute URL for an API path such as `repos/acme/widgets`.
    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.api_base_url.join(path.trim_start_matches('/'))?)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", &self.user_agent)
            .header("X-GitHub-Api-Version", API_VERSION)
            .bearer_auth(&self.token)
    }

    fn send(&self, resource: &str, builder: RequestBuilder) -> Result<Response> {
        debug!("GitHub API request: {}", resource);
        let response = builder.send().map_err(|e| Error::RemoteUnavailable {
            resource: resource.to_string(),
            status: None,
            message: e.to_string(),
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        Err(classify(resource, status, &body))
    }

    fn send_json<T: DeserializeOwned>(&self, resource: &str, builder: RequestBuilder) -> Result<T> {
        parse_json(resource, self.send(resource, builder)?)
    }
}

fn parse_json<T: DeserializeOwned>(resource: &str, response: Response) -> Result<T> {
    response.json::<T>().map_err(|e| Error::RemoteUnavailable {
        resource: resource.to_string(),
        status: None,
        message: format!("unexpected response body: {}", e),
    })
}

/// The `rel="next"` target of a `Link` response header.
pub fn next_link(header: &str) -> Option<Url> {
    header.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces
            .next()?
            .trim()
            .strip_prefix('<')?
            .strip_suffix('>')?;
        if pieces.any(|param| param.trim() == r#"rel="next""#) {
            Url::parse(target).ok()
        } else {
            None
        }
    })
}

/// Follow a paginated listing from `first` until a page has no successor.
///
/// `fetch` returns one page of items and the URL of the next page. Running
/// out of `max_pages` with pages left is an error, never a truncated result.
fn collect_pages<T>(
    resource: &str,
    first: Url,
    max_pages: usize,
    mut fetch: impl FnMut(Url) -> Result<(Vec<T>, Option<Url>)>,
) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut next = Some(first);
    for _ in 0..max_pages {
        let Some(url) = next.take() else {
            return Ok(items);
        };
        let (batch, following) = fetch(url)?;
        items.extend(batch);
        next = following;
    }

    match next {
        None => Ok(items),
        Some(_) => Err(Error::RemoteUnavailable {
            resource: resource.to_string(),
            status: None,
            message: format!("listing has more than {} pages", max_pages),
        }),
    }
}

/// Map an unsuccessful response onto the error contract of [`HostingApi`].
pub fn classify(resource: &str, status: StatusCode, body: &str) -> Error {
    let message = api_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    });

    match status {
        StatusCode::NOT_FOUND => Error::RemoteNotFound {
            resource: resource.to_string(),
        },
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => Error::RemoteConflict {
            resource: resource.to_string(),
            message,
        },
        _ => Error::RemoteUnavailable {
            resource: resource.to_string(),
            status: Some(status.as_u16()),
            message,
        },
    }
}

/// Extract `message` (and validation error messages) from a GitHub error body.
fn api_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ApiError {
        message: String,
        #[serde(default)]
        errors: Vec<serde_json::Value>,
    }

    let parsed: ApiError = serde_json::from_str(body).ok()?;
    let details: Vec<String> = parsed
        .errors
        .iter()
        .filter_map(|e| e.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .collect();
    if details.is_empty() {
        Some(parsed.message)
    } else {
        Some(format!("{} ({})", parsed.message, details.join("; ")))
    }
}

/// Decode the base64 payload of a contents response (GitHub wraps lines).
pub fn decode_content(encoded: &str) -> Result<Vec<u8>> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    BASE64
        .decode(compact)
        .map_err(|e| Error::malformed(format!("file content is not valid base64: {}", e)))
}

#[derive(Deserialize)]
struct OwnerJson {
    login: String,
}

#[derive(Deserialize)]
struct RepositoryJson {
    name: String,
    owner: OwnerJson,
    default_branch: String,
}

impl From<RepositoryJson> for RepositoryInfo {
    fn from(json: RepositoryJson) -> Self {
        RepositoryInfo {
            id: RepoId::new(json.owner.login, json.name),
            default_branch: json.default_branch,
        }
    }
}

#[derive(Deserialize)]
struct HeadJson {
    label: String,
}

#[derive(Deserialize)]
struct PullRequestJson {
    number: u64,
    html_url: String,
    state: String,
    merged_at: Option<String>,
    user: OwnerJson,
    title: String,
    body: Option<String>,
    head: HeadJson,
}

impl From<PullRequestJson> for PullRequestRecord {
    fn from(json: PullRequestJson) -> Self {
        let state = if json.merged_at.is_some() {
            PullRequestState::Merged
        } else if json.state == "open" {
            PullRequestState::Open
        } else {
            PullRequestState::Closed
        };
        PullRequestRecord {
            number: json.number,
            url: json.html_url,
            state,
            author: json.user.login,
            title: json.title,
            body: json.body.unwrap_or_default(),
            head_label: json.head.label,
        }
    }
}

impl HostingApi for GitHubClient {
    fn authenticated_user(&self) -> Result<String> {
        let url = self.endpoint("user")?;
        let user: OwnerJson = self.send_json("user", self.request(Method::GET, url))?;
        Ok(user.login)
    }

    fn get_repository(&self, repo: &RepoId) -> Result<RepositoryInfo> {
        let resource = format!("repos/{}", repo);
        let url = self.endpoint(&resource)?;
        let json: RepositoryJson = self.send_json(&resource, self.request(Method::GET, url))?;
        Ok(json.into())
    }

    fn branch_head(&self, repo: &RepoId, branch: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct ObjectJson {
            sha: String,
        }
        #[derive(Deserialize)]
        struct RefJson {
            object: ObjectJson,
        }

        let resource = format!("repos/{}/git/ref/heads/{}", repo, branch);
        let url = self.endpoint(&resource)?;
        let json: RefJson = self.send_json(&resource, self.request(Method::GET, url))?;
        Ok(json.object.sha)
    }

    fn get_file(&self, repo: &RepoId, path: &str, git_ref: Option<&str>) -> Result<RemoteFile> {
        #[derive(Deserialize)]
        struct ContentJson {
            #[serde(rename = "type")]
            kind: String,
            sha: String,
            #[serde(default)]
            content: String,
        }

        let resource = format!("repos/{}/contents/{}", repo, path);
        let mut url = self.endpoint(&resource)?;
        if let Some(git_ref) = git_ref {
            url.query_pairs_mut().append_pair("ref", git_ref);
        }

        let json: ContentJson = self.send_json(&resource, self.request(Method::GET, url))?;
        if json.kind != "file" {
            return Err(Error::RemoteNotFound { resource });
        }

        Ok(RemoteFile {
            path: path.to_string(),
            content: decode_content(&json.content)?,
            sha: json.sha,
        })
    }

    fn put_file(&self, repo: &RepoId, write: &FileWrite<'_>) -> Result<()> {
        #[derive(Serialize)]
        struct PutContent<'a> {
            message: &'a str,
            content: String,
            branch: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            sha: Option<&'a str>,
        }

        let resource = format!("repos/{}/contents/{}", repo, write.path);
        let url = self.endpoint(&resource)?;
        let body = PutContent {
            message: write.message,
            content: BASE64.encode(write.content),
            branch: write.branch,
            sha: write.sha,
        };
        self.send(&resource, self.request(Method::PUT, url).json(&body))?;
        Ok(())
    }

    fn create_fork(&self, repo: &RepoId) -> Result<RepositoryInfo> {
        let resource = format!("repos/{}/forks", repo);
        let url = self.endpoint(&resource)?;
        let json: RepositoryJson = self.send_json(
            &resource,
            self.request(Method::POST, url).json(&serde_json::json!({})),
        )?;
        Ok(json.into())
    }

    fn create_branch(&self, repo: &RepoId, branch: &str, sha: &str) -> Result<()> {
        let resource = format!("repos/{}/git/refs", repo);
        let url = self.endpoint(&resource)?;
        let body = serde_json::json!({
            "ref": format!("refs/heads/{}", branch),
            "sha": sha,
        });
        self.send(&resource, self.request(Method::POST, url).json(&body))?;
        Ok(())
    }

    fn list_pull_requests(
        &self,
        repo: &RepoId,
        filter: PullRequestFilter,
        head: Option<&str>,
    ) -> Result<Vec<PullRequestRecord>> {
        let resource = format!("repos/{}/pulls", repo);
        let mut first = self.endpoint(&resource)?;
        {
            let mut query = first.query_pairs_mut();
            query
                .append_pair("state", filter.as_query())
                .append_pair("per_page", &PAGE_SIZE.to_string());
            if let Some(head) = head {
                query.append_pair("head", head);
            }
        }

        let records = collect_pages(&resource, first, MAX_PAGES, |url| {
            let response = self.send(&resource, self.request(Method::GET, url))?;
            let next = response
                .headers()
                .get(LINK)
                .and_then(|value| value.to_str().ok())
                .and_then(next_link);
            let batch: Vec<PullRequestJson> = parse_json(&resource, response)?;
            Ok((batch, next))
        })?;

        debug!("Listed {} pull requests for {}", records.len(), repo);
        Ok(records
            .into_iter()
            .map(PullRequestRecord::from)
            .collect())
    }

    fn create_pull_request(&self, repo: &RepoId, pr: &NewPullRequest) -> Result<PullRequestRecord> {
        let resource = format!("repos/{}/pulls", repo);
        let url = self.endpoint(&resource)?;
        let body = serde_json::json!({
            "title": pr.title,
            "body": pr.body,
            "head": pr.head,
            "base": pr.base,
            "maintainer_can_modify": true,
        });
        let json: PullRequestJson =
            self.send_json(&resource, self.request(Method::POST, url).json(&body))?;
        Ok(json.into())
    }

    fn create_issue(&self, repo: &RepoId, title: &str, body: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct IssueJson {
            html_url: String,
        }

        let resource = format!("repos/{}/issues", repo);
        let url = self.endpoint(&resource)?;
        let payload = serde_json::json!({ "title": title, "body": body });
        let json: IssueJson =
            self.send_json(&resource, self.request(Method::POST, url).json(&payload))?;
        Ok(json.html_url)
    }
}
