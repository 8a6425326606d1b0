//! Location resolution
//!
//! A location names one file inside one repository on one forge, plus an
//! optional single-record identifier. It is built in two steps:
//!
//! 1. [`LocationSpec::parse`] turns a human-supplied string into a partial
//!    [`LocationSpec`]. Accepted forms:
//!    - `@github/acme/datasets:main/people.json`
//!    - `@gitlab/acme/datasets/people.csv/42` (record `42`)
//!    - `https://github.com/acme/datasets/blob/main/people.json`
//!    - `https://raw.githubusercontent.com/acme/datasets/main/people.json`
//!    - `https://gitlab.example.com/group/sub/datasets/-/blob/main/people.json`
//!    - `data/people.json` (everything else from the options)
//! 2. [`Location::resolve`] merges it over the session
//!    [`Options`] and validates the result.
//!
//! # Invariants
//!
//! A [`Location`] always has a provider, owner, repository, branch and a
//! non-empty path made of plain segments (no `.`, `..` or empty segments).
//! Operations therefore fail with [`Error::InvalidLocation`] before any
//! network access when a location cannot be built.

use crate::error::{Error, Result};
use crate::options::Options;
use crate::record::Format;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Forge provider namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Provider {
    /// github.com or GitHub Enterprise
    #[default]
    #[serde(rename = "github")]
    GitHub,
    /// gitlab.com or a self-hosted GitLab
    #[serde(rename = "gitlab")]
    GitLab,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::GitHub => write!(f, "github"),
            Provider::GitLab => write!(f, "gitlab"),
        }
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "github" => Ok(Provider::GitHub),
            "gitlab" => Ok(Provider::GitLab),
            other => Err(Error::invalid_location(format!(
                "unknown namespace '{}', expected \"github\" or \"gitlab\"",
                other
            ))),
        }
    }
}

// =============================================================================
// LocationSpec
// =============================================================================

/// A partially specified location, as parsed from a string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationSpec {
    /// Forge provider
    pub namespace: Option<Provider>,
    /// Self-hosted server host
    pub server: Option<String>,
    /// Repository owner; may contain `/` for GitLab subgroups
    pub owner: Option<String>,
    /// Repository name
    pub repo: Option<String>,
    /// Branch
    pub branch: Option<String>,
    /// File path inside the repository
    pub path: Option<String>,
    /// Single-record identifier
    pub resource: Option<String>,
}

impl LocationSpec {
    /// Parse a location string.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::invalid_location("location is empty"));
        }
        if let Some(rest) = input.strip_prefix('@') {
            Self::parse_short(rest)
        } else if input.starts_with("https://") || input.starts_with("http://") {
            Self::parse_url(input)
        } else {
            let (path, resource) = split_resource(segments(input));
            Ok(LocationSpec {
                path,
                resource,
                ..Default::default()
            })
        }
    }

    /// `{namespace}/{owner}/{repo}[:{branch}]/{path...}`
    fn parse_short(rest: &str) -> Result<Self> {
        let segs = segments(rest);
        if segs.len() < 3 {
            return Err(Error::invalid_location(format!(
                "'@{}' needs at least namespace/owner/repo",
                rest
            )));
        }
        let namespace: Provider = segs[0].parse()?;
        let (repo, branch) = match segs[2].split_once(':') {
            Some((repo, branch)) => (repo, non_empty(branch)),
            None => (segs[2], None),
        };
        let (path, resource) = split_resource(segs[3..].to_vec());
        Ok(LocationSpec {
            namespace: Some(namespace),
            server: None,
            owner: Some(segs[1].to_string()),
            repo: non_empty(repo),
            branch,
            path,
            resource,
        })
    }

    fn parse_url(input: &str) -> Result<Self> {
        let url = Url::parse(input)
            .map_err(|e| Error::invalid_location(format!("'{}' is not a valid URL: {}", input, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| Error::invalid_location(format!("'{}' has no host", input)))?
            .to_ascii_lowercase();
        let segs: Vec<String> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).map(decode_segment).collect())
            .unwrap_or_default();
        let segs: Vec<&str> = segs.iter().map(String::as_str).collect();

        match host.as_str() {
            "raw.githubusercontent.com" => {
                // owner/repo/branch/path...
                if segs.len() < 3 {
                    return Err(Error::invalid_location(format!("'{}' is missing owner/repo/branch", input)));
                }
                let (path, resource) = split_resource(segs[3..].to_vec());
                Ok(LocationSpec {
                    namespace: Some(Provider::GitHub),
                    server: None,
                    owner: Some(segs[0].to_string()),
                    repo: Some(segs[1].to_string()),
                    branch: Some(segs[2].to_string()),
                    path,
                    resource,
                })
            }
            "api.github.com" => {
                // repos/owner/repo/contents/path...?ref=branch
                if segs.len() < 4 || segs[0] != "repos" || segs[3] != "contents" {
                    return Err(Error::invalid_location(format!("'{}' is not a contents API URL", input)));
                }
                let branch = url
                    .query_pairs()
                    .find(|(k, _)| k == "ref")
                    .map(|(_, v)| v.into_owned());
                let (path, resource) = split_resource(segs[4..].to_vec());
                Ok(LocationSpec {
                    namespace: Some(Provider::GitHub),
                    server: None,
                    owner: Some(segs[1].to_string()),
                    repo: Some(segs[2].to_string()),
                    branch,
                    path,
                    resource,
                })
            }
            "github.com" | "www.github.com" => {
                // owner/repo/(blob|raw)/branch/path...
                if segs.len() < 4 || !matches!(segs[2], "blob" | "raw" | "tree") {
                    return Err(Error::invalid_location(format!(
                        "'{}' is missing owner/repo/blob/branch",
                        input
                    )));
                }
                let (path, resource) = split_resource(segs[4..].to_vec());
                Ok(LocationSpec {
                    namespace: Some(Provider::GitHub),
                    server: None,
                    owner: Some(segs[0].to_string()),
                    repo: Some(segs[1].to_string()),
                    branch: Some(segs[3].to_string()),
                    path,
                    resource,
                })
            }
            _ => {
                // GitLab: owner.../repo/-/(blob|raw)/branch/path...
                let dash = segs.iter().position(|s| *s == "-").ok_or_else(|| {
                    Error::invalid_location(format!("'{}' is not a recognised forge URL", input))
                })?;
                if dash < 2 || segs.len() < dash + 3 || !matches!(segs[dash + 1], "blob" | "raw") {
                    return Err(Error::invalid_location(format!(
                        "'{}' is missing group/repo/-/blob/branch",
                        input
                    )));
                }
                let (path, resource) = split_resource(segs[dash + 3..].to_vec());
                let server = match url.port() {
                    Some(port) => format!("{}:{}", host, port),
                    None => host.clone(),
                };
                Ok(LocationSpec {
                    namespace: Some(Provider::GitLab),
                    server: if host == "gitlab.com" { None } else { Some(server) },
                    owner: Some(segs[..dash - 1].join("/")),
                    repo: Some(segs[dash - 1].to_string()),
                    branch: Some(segs[dash + 2].to_string()),
                    path,
                    resource,
                })
            }
        }
    }
}

fn segments(s: &str) -> Vec<&str> {
    s.split('/').filter(|seg| !seg.is_empty()).collect()
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn decode_segment(seg: &str) -> String {
    // `+` is literal in a path segment, unlike in a query string.
    url::form_urlencoded::parse(format!("s={}", seg.replace('+', "%2B")).as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_else(|| seg.to_string())
}

fn is_data_file(seg: &str) -> bool {
    let lower = seg.to_ascii_lowercase();
    lower.ends_with(".json") || lower.ends_with(".csv")
}

/// Split `[.., "people.json", "42"]` into path `../people.json` and record `42`.
fn split_resource(segs: Vec<&str>) -> (Option<String>, Option<String>) {
    if segs.is_empty() {
        return (None, None);
    }
    let n = segs.len();
    if n >= 2 && is_data_file(segs[n - 2]) && !is_data_file(segs[n - 1]) {
        (Some(segs[..n - 1].join("/")), Some(segs[n - 1].to_string()))
    } else {
        (Some(segs.join("/")), None)
    }
}

// =============================================================================
// Location
// =============================================================================

/// A fully-qualified, validated file location
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    namespace: Provider,
    server: Option<String>,
    owner: String,
    repo: String,
    branch: String,
    path: String,
    resource: Option<String>,
}

impl Location {
    /// Merge a parsed spec over the session options and validate it.
    pub fn resolve(spec: &LocationSpec, options: &Options) -> Result<Self> {
        let namespace = spec.namespace.unwrap_or(options.namespace);
        // A server configured for another provider does not carry over.
        let server = match (&spec.server, spec.namespace) {
            (Some(server), _) => Some(server.clone()),
            (None, Some(ns)) if ns != options.namespace => None,
            (None, _) => options.server.clone(),
        };
        let owner = required(spec.owner.as_ref().or(options.owner.as_ref()), "owner")?;
        let repo = required(spec.repo.as_ref().or(options.repo.as_ref()), "repository")?;
        let branch = required(spec.branch.as_ref().or(Some(&options.branch)), "branch")?;
        let path = required(spec.path.as_ref().or(options.path.as_ref()), "file path")?;

        let path = path.trim_matches('/').replace('\\', "/");
        if let Some(bad) = path.split('/').find(|seg| matches!(*seg, "" | "." | "..")) {
            return Err(Error::invalid_location(format!(
                "path '{}' contains non-normal segment {:?}",
                path, bad
            )));
        }
        if owner.split('/').any(|seg| seg.is_empty() || seg == "..") || repo.contains('/') {
            return Err(Error::invalid_location(format!(
                "'{}/{}' is not a valid repository",
                owner, repo
            )));
        }

        Ok(Location {
            namespace,
            server,
            owner,
            repo,
            branch,
            path,
            resource: spec.resource.clone(),
        })
    }

    /// Parse a location string and resolve it against the options.
    pub fn parse(input: &str, options: &Options) -> Result<Self> {
        Self::resolve(&LocationSpec::parse(input)?, options)
    }

    /// Forge provider
    pub fn namespace(&self) -> Provider {
        self.namespace
    }

    /// Self-hosted server host, if any
    pub fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    /// Repository owner
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Branch
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// File path inside the repository
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Single-record identifier embedded in the location string
    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    /// The same location without a record identifier
    pub fn without_resource(&self) -> Self {
        Location {
            resource: None,
            ..self.clone()
        }
    }

    /// Guess the notation from the file extension
    pub fn infer_format(&self) -> Format {
        if self.path.to_ascii_lowercase().ends_with(".csv") {
            Format::Csv
        } else {
            Format::Json
        }
    }

    // =========================================================================
    // URLs
    // =========================================================================

    /// Contents API endpoint for this file.
    pub fn api_url(&self) -> Result<Url> {
        match self.namespace {
            Provider::GitHub => {
                let base = match &self.server {
                    Some(server) => format!("https://{}/api/v3", server),
                    None => "https://api.github.com".to_string(),
                };
                build_url(&base, |segs| {
                    segs.extend(["repos", self.owner.as_str(), self.repo.as_str(), "contents"]);
                    segs.extend(self.path.split('/'));
                })
            }
            Provider::GitLab => {
                let base = format!("https://{}/api/v4", self.server.as_deref().unwrap_or("gitlab.com"));
                let project = format!("{}/{}", self.owner, self.repo);
                build_url(&base, |segs| {
                    // Project and file path are single, fully-encoded segments.
                    segs.extend(["projects", project.as_str(), "repository", "files", self.path.as_str()]);
                })
            }
        }
    }

    /// Contents API endpoint pinned to this location's branch.
    pub fn api_url_at_branch(&self) -> Result<Url> {
        let mut url = self.api_url()?;
        url.query_pairs_mut().append_pair("ref", &self.branch);
        Ok(url)
    }

    /// URL serving the raw file bytes.
    pub fn raw_url(&self) -> Result<Url> {
        match (self.namespace, &self.server) {
            (Provider::GitHub, None) => build_url("https://raw.githubusercontent.com", |segs| {
                segs.extend(self.owner.split('/'));
                segs.extend([&self.repo, &self.branch]);
                segs.extend(self.path.split('/'));
            }),
            (Provider::GitHub, Some(server)) => build_url(&format!("https://{}", server), |segs| {
                segs.extend(self.owner.split('/'));
                segs.extend([self.repo.as_str(), "raw", self.branch.as_str()]);
                segs.extend(self.path.split('/'));
            }),
            (Provider::GitLab, server) => {
                build_url(&format!("https://{}", server.as_deref().unwrap_or("gitlab.com")), |segs| {
                    segs.extend(self.owner.split('/'));
                    segs.extend([self.repo.as_str(), "-", "raw", self.branch.as_str()]);
                    segs.extend(self.path.split('/'));
                })
            }
        }
    }

    /// Human-facing URL of the file in the forge's web interface.
    pub fn web_url(&self) -> Result<Url> {
        let (default_host, marker): (&str, &[&str]) = match self.namespace {
            Provider::GitHub => ("github.com", &["blob"]),
            Provider::GitLab => ("gitlab.com", &["-", "blob"]),
        };
        let host = self.server.as_deref().unwrap_or(default_host);
        build_url(&format!("https://{}", host), |segs| {
            segs.extend(self.owner.split('/'));
            segs.push(&self.repo);
            segs.extend(marker.iter().copied());
            segs.push(&self.branch);
            segs.extend(self.path.split('/'));
        })
    }

    /// Raw or web URL, as requested
    pub fn url(&self, raw: bool) -> Result<Url> {
        if raw {
            self.raw_url()
        } else {
            self.web_url()
        }
    }
}

fn build_url(base: &str, f: impl FnOnce(&mut url::PathSegmentsMut<'_>)) -> Result<Url> {
    let mut url = Url::parse(base)
        .map_err(|e| Error::invalid_location(format!("invalid server '{}': {}", base, e)))?;
    {
        let mut segs = url
            .path_segments_mut()
            .map_err(|_| Error::invalid_location(format!("'{}' cannot be a base URL", base)))?;
        segs.pop_if_empty();
        f(&mut segs);
    }
    Ok(url)
}

fn required(value: Option<&String>, what: &str) -> Result<String> {
    match value.map(|v| v.trim()) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(Error::invalid_location(format!("{} is missing", what))),
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.namespace)?;
        if let Some(server) = &self.server {
            write!(f, "[{}]", server)?;
        }
        write!(f, "/{}/{}:{}/{}", self.owner, self.repo, self.branch, self.path)?;
        if let Some(resource) = &self.resource {
            write!(f, "/{}", resource)?;
        }
        Ok(())
    }
}
