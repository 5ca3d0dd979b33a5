//! In-memory hosting platform for unit tests.
//!
//! `FakeHosting` keeps repositories, branches, files, and pull requests in a
//! mutex-guarded state and records every call, so tests can assert on the
//! remote writes a phase issued as well as on its result. Failures and races
//! are injected explicitly.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::locator::RepoId;
use crate::repository::{
    FileWrite, HostingApi, NewPullRequest, PullRequestFilter, PullRequestRecord,
    PullRequestState, RemoteFile, RepositoryInfo,
};

#[derive(Debug, Clone)]
struct FakeFile {
    content: Vec<u8>,
    sha: String,
}

#[derive(Debug, Clone)]
struct FakeRepo {
    default_branch: String,
    /// branch -> head sha
    heads: HashMap<String, String>,
    /// branch -> path -> file
    files: HashMap<String, HashMap<String, FakeFile>>,
}

impl FakeRepo {
    fn new(default_branch: &str) -> Self {
        let mut heads = HashMap::new();
        heads.insert(default_branch.to_string(), format!("{}-head", default_branch));
        let mut files = HashMap::new();
        files.insert(default_branch.to_string(), HashMap::new());
        Self {
            default_branch: default_branch.to_string(),
            heads,
            files,
        }
    }
}

#[derive(Default)]
struct FakeState {
    repos: HashMap<String, FakeRepo>,
    pulls: HashMap<String, Vec<PullRequestRecord>>,
    issues: Vec<(String, String, String)>,
    calls: Vec<String>,
    failures: HashMap<&'static str, u16>,
    counter: u64,
    /// Lookups of a freshly created fork that still report "not found".
    fork_propagation_lookups: u32,
    pending_forks: HashMap<String, u32>,
    fork_create_conflict: bool,
    concurrent_pull: Option<PullRequestRecord>,
}

/// In-memory [`HostingApi`].
pub struct FakeHosting {
    identity: String,
    state: Mutex<FakeState>,
}

impl FakeHosting {
    /// A platform where `identity` is the authenticated user.
    pub fn new(identity: &str) -> Self {
        Self {
            identity: identity.to_string(),
            state: Mutex::new(FakeState::default()),
        }
    }

    /// Add an empty repository with a `main` default branch.
    pub fn with_repo(self, full_name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .repos
            .insert(full_name.to_string(), FakeRepo::new("main"));
        self
    }

    /// Add a file on the default branch of an existing repository.
    pub fn with_file(self, full_name: &str, path: &str, content: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.counter += 1;
            let sha = format!("blob-{}", state.counter);
            let repo = state.repos.get_mut(full_name).expect("repo must exist");
            let branch = repo.default_branch.clone();
            repo.files.entry(branch).or_default().insert(
                path.to_string(),
                FakeFile {
                    content: content.as_bytes().to_vec(),
                    sha,
                },
            );
        }
        self
    }

    /// Add an existing pull request against `full_name`.
    pub fn with_pull(self, full_name: &str, record: PullRequestRecord) -> Self {
        self.state
            .lock()
            .unwrap()
            .pulls
            .entry(full_name.to_string())
            .or_default()
            .push(record);
        self
    }

    /// Make every call of `op` fail with the given HTTP status.
    pub fn failing(self, op: &'static str, status: u16) -> Self {
        self.state.lock().unwrap().failures.insert(op, status);
        self
    }

    /// A created fork stays invisible for `lookups` repository lookups.
    pub fn with_fork_propagation(self, lookups: u32) -> Self {
        self.state.lock().unwrap().fork_propagation_lookups = lookups;
        self
    }

    /// Fork creation reports "already exists" (after creating the fork).
    pub fn with_fork_create_conflict(self) -> Self {
        self.state.lock().unwrap().fork_create_conflict = true;
        self
    }

    /// A concurrent run opens `record` just before our creation attempt.
    pub fn with_concurrent_pull(self, record: PullRequestRecord) -> Self {
        self.state.lock().unwrap().concurrent_pull = Some(record);
        self
    }

    /// Create a branch directly, as another run would.
    pub fn create_branch_directly(&self, full_name: &str, branch: &str) {
        let mut state = self.state.lock().unwrap();
        let repo = state.repos.get_mut(full_name).expect("repo must exist");
        let default_branch = repo.default_branch.clone();
        let head = repo.heads[&default_branch].clone();
        let files = repo.files.get(&default_branch).cloned().unwrap_or_default();
        repo.heads.insert(branch.to_string(), head);
        repo.files.insert(branch.to_string(), files);
    }

    /// Overwrite a file on a branch without going through the API.
    pub fn set_file_directly(&self, full_name: &str, branch: &str, path: &str, content: &str) {
        let mut state = self.state.lock().unwrap();
        state.counter += 1;
        let sha = format!("blob-{}", state.counter);
        let repo = state.repos.get_mut(full_name).expect("repo must exist");
        repo.files.entry(branch.to_string()).or_default().insert(
            path.to_string(),
            FakeFile {
                content: content.as_bytes().to_vec(),
                sha,
            },
        );
    }

    /// Every call in order, as `op target`.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of calls of `op`.
    pub fn count(&self, op: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.split(' ').next() == Some(op))
            .count()
    }

    /// Calls that change remote state.
    pub fn writes(&self) -> Vec<String> {
        const WRITES: [&str; 5] = [
            "put_file",
            "create_fork",
            "create_branch",
            "create_pull_request",
            "create_issue",
        ];
        self.calls()
            .into_iter()
            .filter(|c| WRITES.iter().any(|w| c.split(' ').next() == Some(*w)))
            .collect()
    }

    /// Content of a file on a branch.
    pub fn file(&self, full_name: &str, branch: &str, path: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .repos
            .get(full_name)
            .and_then(|r| r.files.get(branch))
            .and_then(|f| f.get(path))
            .map(|f| String::from_utf8_lossy(&f.content).to_string())
    }

    pub fn has_repo(&self, full_name: &str) -> bool {
        self.state.lock().unwrap().repos.contains_key(full_name)
    }

    pub fn branches(&self, full_name: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let mut names: Vec<String> = state
            .repos
            .get(full_name)
            .map(|r| r.heads.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn pulls(&self, full_name: &str) -> Vec<PullRequestRecord> {
        self.state
            .lock()
            .unwrap()
            .pulls
            .get(full_name)
            .cloned()
            .unwrap_or_default()
    }

    pub fn issues(&self) -> Vec<(String, String, String)> {
        self.state.lock().unwrap().issues.clone()
    }

    fn record(&self, op: &'static str, target: String) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("{} {}", op, target));
        match state.failures.get(op) {
            Some(404) => Err(Error::RemoteNotFound { resource: target }),
            Some(409) | Some(422) => Err(Error::RemoteConflict {
                resource: target,
                message: "injected conflict".to_string(),
            }),
            Some(status) => Err(Error::RemoteUnavailable {
                resource: target,
                status: Some(*status),
                message: "injected failure".to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// A pull request record for seeding the fake.
pub fn pull(
    number: u64,
    target: &str,
    author: &str,
    state: PullRequestState,
    title: &str,
    body: &str,
    head_label: &str,
) -> PullRequestRecord {
    PullRequestRecord {
        number,
        url: format!("https://github.com/{}/pull/{}", target, number),
        state,
        author: author.to_string(),
        title: title.to_string(),
        body: body.to_string(),
        head_label: head_label.to_string(),
    }
}

impl HostingApi for FakeHosting {
    fn authenticated_user(&self) -> Result<String> {
        self.record("authenticated_user", String::new())?;
        Ok(self.identity.clone())
    }

    fn get_repository(&self, repo: &RepoId) -> Result<RepositoryInfo> {
        self.record("get_repository", repo.full_name())?;
        let mut state = self.state.lock().unwrap();
        let key = repo.full_name();
        if let Some(remaining) = state.pending_forks.get_mut(&key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(Error::RemoteNotFound { resource: key });
            }
        }
        state
            .repos
            .get(&key)
            .map(|r| RepositoryInfo {
                id: repo.clone(),
                default_branch: r.default_branch.clone(),
            })
            .ok_or(Error::RemoteNotFound { resource: key })
    }

    fn branch_head(&self, repo: &RepoId, branch: &str) -> Result<String> {
        self.record("branch_head", format!("{}@{}", repo, branch))?;
        let state = self.state.lock().unwrap();
        state
            .repos
            .get(&repo.full_name())
            .and_then(|r| r.heads.get(branch))
            .cloned()
            .ok_or(Error::RemoteNotFound {
                resource: format!("{}@{}", repo, branch),
            })
    }

    fn get_file(&self, repo: &RepoId, path: &str, git_ref: Option<&str>) -> Result<RemoteFile> {
        self.record(
            "get_file",
            format!("{}:{}@{}", repo, path, git_ref.unwrap_or("default")),
        )?;
        let state = self.state.lock().unwrap();
        let not_found = || Error::RemoteNotFound {
            resource: format!("{}:{}", repo, path),
        };
        let repo_state = state.repos.get(&repo.full_name()).ok_or_else(not_found)?;
        let branch = git_ref.unwrap_or(&repo_state.default_branch);
        let file = repo_state
            .files
            .get(branch)
            .and_then(|files| files.get(path))
            .ok_or_else(not_found)?;
        Ok(RemoteFile {
            path: path.to_string(),
            content: file.content.clone(),
            sha: file.sha.clone(),
        })
    }

    fn put_file(&self, repo: &RepoId, write: &FileWrite<'_>) -> Result<()> {
        self.record(
            "put_file",
            format!("{}:{}@{}", repo, write.path, write.branch),
        )?;
        let mut state = self.state.lock().unwrap();
        state.counter += 1;
        let new_sha = format!("blob-{}", state.counter);
        let commit = format!("commit-{}", state.counter);
        let resource = format!("{}:{}", repo, write.path);

        let repo_state = state
            .repos
            .get_mut(&repo.full_name())
            .ok_or(Error::RemoteNotFound {
                resource: resource.clone(),
            })?;
        if !repo_state.heads.contains_key(write.branch) {
            return Err(Error::RemoteNotFound { resource });
        }
        let files = repo_state.files.entry(write.branch.to_string()).or_default();
        let current = files.get(write.path).map(|f| f.sha.clone());
        if current.as_deref() != write.sha {
            return Err(Error::RemoteConflict {
                resource,
                message: "version token does not match".to_string(),
            });
        }
        files.insert(
            write.path.to_string(),
            FakeFile {
                content: write.content.to_vec(),
                sha: new_sha,
            },
        );
        repo_state.heads.insert(write.branch.to_string(), commit);
        Ok(())
    }

    fn create_fork(&self, repo: &RepoId) -> Result<RepositoryInfo> {
        self.record("create_fork", repo.full_name())?;
        let mut state = self.state.lock().unwrap();
        let upstream = state
            .repos
            .get(&repo.full_name())
            .cloned()
            .ok_or(Error::RemoteNotFound {
                resource: repo.full_name(),
            })?;
        let fork_id = RepoId::new(self.identity.clone(), repo.name.clone());
        let key = fork_id.full_name();

        let existed = state.repos.contains_key(&key);
        if !existed {
            let mut fork = FakeRepo::new(&upstream.default_branch);
            let branch = upstream.default_branch.clone();
            fork.heads
                .insert(branch.clone(), upstream.heads[&branch].clone());
            fork.files
                .insert(branch.clone(), upstream.files.get(&branch).cloned().unwrap_or_default());
            state.repos.insert(key.clone(), fork);
            let delay = state.fork_propagation_lookups;
            state.pending_forks.insert(key.clone(), delay);
        }

        if state.fork_create_conflict {
            return Err(Error::RemoteConflict {
                resource: format!("{}/forks", repo),
                message: "fork already exists".to_string(),
            });
        }

        Ok(RepositoryInfo {
            id: fork_id,
            default_branch: upstream.default_branch,
        })
    }

    fn create_branch(&self, repo: &RepoId, branch: &str, sha: &str) -> Result<()> {
        self.record("create_branch", format!("{}@{}", repo, branch))?;
        let mut state = self.state.lock().unwrap();
        let repo_state = state
            .repos
            .get_mut(&repo.full_name())
            .ok_or(Error::RemoteNotFound {
                resource: repo.full_name(),
            })?;
        if repo_state.heads.contains_key(branch) {
            return Err(Error::RemoteConflict {
                resource: format!("{}/git/refs", repo),
                message: "Reference already exists".to_string(),
            });
        }
        let source = repo_state
            .heads
            .iter()
            .find(|(_, head)| head.as_str() == sha)
            .map(|(name, _)| name.clone())
            .ok_or(Error::RemoteConflict {
                resource: format!("{}/git/refs", repo),
                message: "Object does not exist".to_string(),
            })?;
        let files = repo_state.files.get(&source).cloned().unwrap_or_default();
        repo_state.heads.insert(branch.to_string(), sha.to_string());
        repo_state.files.insert(branch.to_string(), files);
        Ok(())
    }

    fn list_pull_requests(
        &self,
        repo: &RepoId,
        filter: PullRequestFilter,
        head: Option<&str>,
    ) -> Result<Vec<PullRequestRecord>> {
        self.record(
            "list_pull_requests",
            format!("{} state={} head={}", repo, filter.as_query(), head.unwrap_or("-")),
        )?;
        let state = self.state.lock().unwrap();
        Ok(state
            .pulls
            .get(&repo.full_name())
            .map(|pulls| {
                pulls
                    .iter()
                    .filter(|p| filter == PullRequestFilter::All || p.state == PullRequestState::Open)
                    .filter(|p| head.map_or(true, |h| p.head_label == h))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn create_pull_request(&self, repo: &RepoId, pr: &NewPullRequest) -> Result<PullRequestRecord> {
        self.record("create_pull_request", format!("{} head={}", repo, pr.head))?;
        let mut state = self.state.lock().unwrap();
        let key = repo.full_name();

        if let Some(concurrent) = state.concurrent_pull.take() {
            state.pulls.entry(key.clone()).or_default().push(concurrent);
        }

        let pulls = state.pulls.entry(key.clone()).or_default();
        if pulls
            .iter()
            .any(|p| p.state == PullRequestState::Open && p.head_label == pr.head)
        {
            return Err(Error::RemoteConflict {
                resource: format!("{}/pulls", key),
                message: format!("A pull request already exists for {}.", pr.head),
            });
        }

        let number = pulls.len() as u64 + 1;
        let record = PullRequestRecord {
            number,
            url: format!("https://github.com/{}/pull/{}", key, number),
            state: PullRequestState::Open,
            author: self.identity.clone(),
            title: pr.title.clone(),
            body: pr.body.clone(),
            head_label: pr.head.clone(),
        };
        pulls.push(record.clone());
        Ok(record)
    }

    fn create_issue(&self, repo: &RepoId, title: &str, body: &str) -> Result<String> {
        self.record("create_issue", repo.full_name())?;
        let mut state = self.state.lock().unwrap();
        state
            .issues
            .push((repo.full_name(), title.to_string(), body.to_string()));
        Ok(format!(
            "https://github.com/{}/issues/{}",
            repo,
            state.issues.len()
        ))
    }
}
