//! Pull request reconciliation.
//!
//! A pull request is identified by what it carries, not by its branch: a PR
//! authored by the acting identity whose title matches the template and whose
//! body embeds the canonical URL satisfies the request, whatever state it is
//! in. Creation only happens when no such PR exists, and an "already exists"
//! race on creation falls back to searching again.

use log::{debug, info, warn};

use crate::content::CanonicalUrl;
use crate::error::Result;
use crate::locator::RepoId;
use crate::phases::branch::BranchRef;
use crate::phases::fork::ForkHandle;
use crate::phases::Outcome;
use crate::repository::{
    HostingApi, NewPullRequest, PullRequestFilter, PullRequestRecord, RepositoryInfo,
};
use crate::request::ReconciliationRequest;

/// Title suffix shared by every title the template has produced.
const TITLE_SUFFIX: &str = "FUNDING.yml";

/// Title and body of the pull requests this tool opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestTemplate {
    pub title: String,
    /// Ending shared by earlier wordings of `title`; a PR whose title ends
    /// with it is still recognized as one of ours.
    pub title_suffix: String,
}

impl Default for PullRequestTemplate {
    fn default() -> Self {
        Self {
            title: format!("Add sponsorship link to {}", TITLE_SUFFIX),
            title_suffix: TITLE_SUFFIX.to_string(),
        }
    }
}

impl PullRequestTemplate {
    /// True for the template's own title and for any title ending with
    /// `title_suffix`.
    pub fn title_matches(&self, title: &str) -> bool {
        let title = title.trim();
        title == self.title.trim()
            || (!self.title_suffix.is_empty() && title.ends_with(self.title_suffix.as_str()))
    }

    /// The body embeds the canonical URL verbatim; later runs search for it.
    pub fn body(&self, request: &ReconciliationRequest) -> String {
        format!(
            "Hi @{handle}!\n\n\
             This adds the sponsorship link for request #{id} to `{file}`:\n\n\
             {url}\n\n\
             Once merged, the link shows up under the repository's Sponsor button.\n",
            handle = request.requester_handle,
            id = request.request_id,
            file = TITLE_SUFFIX,
            url = request.canonical_url,
        )
    }
}

/// True if `text` contains `url` as a whole link, not as a prefix of a
/// longer one (`?issue=4` must not match `?issue=42`).
fn contains_url(text: &str, url: &str) -> bool {
    text.match_indices(url).any(|(start, _)| {
        match text[start + url.len()..].chars().next() {
            None => true,
            Some(c) => !(c.is_alphanumeric() || "-_~%&=/#+".contains(c)),
        }
    })
}

/// First PR against `target` (any state, remote order) that was opened by
/// `acting_identity` for `canonical`.
pub fn find_by_content(
    api: &dyn HostingApi,
    target: &RepoId,
    acting_identity: &str,
    canonical: &CanonicalUrl,
    template: &PullRequestTemplate,
) -> Result<Option<PullRequestRecord>> {
    let pulls = api.list_pull_requests(target, PullRequestFilter::All, None)?;
    debug!("Searching {} pull request(s) in {}", pulls.len(), target);
    Ok(pulls.into_iter().find(|pr| {
        pr.author.eq_ignore_ascii_case(acting_identity)
            && template.title_matches(&pr.title)
            && contains_url(&pr.body, canonical.as_str())
    }))
}

/// Ensure a pull request for `request` exists from the fork branch into the
/// target's default branch.
///
/// # Errors
///
/// Listing failures, creation failures other than "already exists", and an
/// "already exists" conflict for which no matching PR can be found.
pub fn ensure_pull_request(
    api: &dyn HostingApi,
    request: &ReconciliationRequest,
    target: &RepositoryInfo,
    fork: &ForkHandle,
    branch: &BranchRef,
    acting_identity: &str,
    template: &PullRequestTemplate,
) -> Result<Outcome> {
    let canonical = &request.canonical_url;
    if let Some(existing) = find_by_content(api, &target.id, acting_identity, canonical, template)? {
        info!("Pull request already exists: {}", existing.url);
        return Ok(Outcome::AlreadySatisfied {
            reference: existing.url,
        });
    }

    open_pull_request(api, request, target, fork, branch, acting_identity, template)
}

/// Open the pull request without a prior content search, resolving an
/// "already exists" race to the existing PR.
///
/// For callers that have just run [`find_by_content`] themselves.
///
/// # Errors
///
/// Same as [`ensure_pull_request`].
pub fn open_pull_request(
    api: &dyn HostingApi,
    request: &ReconciliationRequest,
    target: &RepositoryInfo,
    fork: &ForkHandle,
    branch: &BranchRef,
    acting_identity: &str,
    template: &PullRequestTemplate,
) -> Result<Outcome> {
    let canonical = &request.canonical_url;
    let head = format!("{}:{}", fork.id.owner, branch.name);
    let new_pr = NewPullRequest {
        title: template.title.clone(),
        body: template.body(request),
        head: head.clone(),
        base: target.default_branch.clone(),
    };

    match api.create_pull_request(&target.id, &new_pr) {
        Ok(created) => {
            info!("Opened pull request {}", created.url);
            Ok(Outcome::Created {
                pr_url: created.url,
            })
        }
        Err(e) if e.is_conflict() => {
            warn!("Pull request for {} already exists: {}", head, e);
            let open = api.list_pull_requests(&target.id, PullRequestFilter::Open, Some(&head))?;
            if let Some(existing) = open.into_iter().next() {
                return Ok(Outcome::AlreadySatisfied {
                    reference: existing.url,
                });
            }
            match find_by_content(api, &target.id, acting_identity, canonical, template)? {
                Some(existing) => Ok(Outcome::AlreadySatisfied {
                    reference: existing.url,
                }),
                None => Err(e),
            }
        }
        Err(e) => Err(e),
    }
}
