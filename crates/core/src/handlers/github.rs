use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{Context, Handler, endpoint, segments};
use crate::humanize::format_count;
use crate::outcome::{Outcome, Rejection};
use crate::summary::{Summary, bold, collapse_whitespace, join_facets, truncate};

/// First path segments on github.com that are not user or organization names.
const RESERVED_OWNERS: &[&str] = &[
    "about",
    "collections",
    "enterprise",
    "explore",
    "features",
    "login",
    "marketplace",
    "notifications",
    "orgs",
    "pricing",
    "search",
    "settings",
    "sponsors",
    "topics",
    "trending",
];

const MAX_DESCRIPTION: usize = 250;

#[derive(Debug, Deserialize)]
struct Repository {
    full_name: String,
    description: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    language: Option<String>,
    #[serde(default)]
    archived: bool,
}

impl Repository {
    fn line(&self) -> String {
        let description = self
            .description
            .as_deref()
            .map(collapse_whitespace)
            .filter(|d| !d.is_empty())
            .map(|d| bold(&truncate(&d, MAX_DESCRIPTION)))
            .unwrap_or_default();

        join_facets([
            description,
            self.full_name.clone(),
            format!("{} stars", format_count(self.stargazers_count)),
            format!("{} forks", format_count(self.forks_count)),
            self.language.clone().unwrap_or_default(),
            if self.archived { "archived".to_string() } else { String::new() },
        ])
    }
}

/// `github.com/{owner}/{repo}` links, through the REST API.
#[derive(Debug, Clone, Copy, Default)]
pub struct GithubHandler;

#[async_trait]
impl Handler for GithubHandler {
    fn name(&self) -> &str {
        "github"
    }

    async fn handle(&self, cx: &Context<'_>, url: &Url) -> Outcome {
        let (owner, repo) = match segments(url).as_slice() {
            [owner, repo, ..] if !RESERVED_OWNERS.contains(owner) => {
                (owner.to_string(), repo.trim_end_matches(".git").to_string())
            }
            _ => return Outcome::NotApplicable,
        };

        let api = match endpoint(&cx.config().endpoints.github, &format!("/repos/{}/{}", owner, repo)) {
            Ok(api) => api,
            Err(err) => return Outcome::Rejected(Rejection::from(&err)),
        };
        let request = cx
            .request(api)
            .impersonate(false)
            .header("Accept", "application/vnd.github+json");

        match cx.retriever().fetch_json::<Repository>(&request).await {
            Ok(repository) => Outcome::Summary(Summary::new(repository.line())),
            Err(err) => {
                debug!(url = %url, error = %err, "repository unavailable");
                Outcome::Rejected(Rejection::from(&err))
            }
        }
    }
}
