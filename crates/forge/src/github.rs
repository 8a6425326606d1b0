//! GitHub contents API
//!
//! | Operation | Request |
//! |-----------|---------|
//! | pull | `GET /repos/{o}/{r}/contents/{path}?ref={branch}` |
//! | fetch | `GET https://raw.githubusercontent.com/{o}/{r}/{branch}/{path}` |
//! | put | `PUT /repos/{o}/{r}/contents/{path}` with `{message, content, branch, committer, sha?}` |
//! | delete | `DELETE /repos/{o}/{r}/contents/{path}` with `{message, sha, branch, committer}` |
//!
//! The revision token is the blob `sha`. A put without `sha` on an existing
//! file, or with a stale one, is rejected with 409 or 422.

use crate::encoding::{decode_base64, encode_base64};
use crate::transport::{HttpRequest, HttpResponse, Method};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use repotable_core::{Blob, Commit, Error, Location, Options, Result, RevisionToken};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct Contents {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

fn authorize(request: HttpRequest, options: &Options) -> HttpRequest {
    let request = request
        .header("Accept", "application/vnd.github+json")
        .header("User-Agent", crate::USER_AGENT);
    match (&options.user, &options.token) {
        (Some(user), Some(token)) => request.header(
            "Authorization",
            format!("Basic {}", STANDARD.encode(format!("{}:{}", user, token))),
        ),
        (None, Some(token)) => request.header("Authorization", format!("Bearer {}", token)),
        _ => request,
    }
}

fn commit_body(location: &Location, options: &Options) -> Value {
    json!({
        "message": options.message,
        "branch": location.branch(),
        "committer": {
            "name": options.author.name,
            "email": options.author.email,
        },
    })
}

/// Request for the current blob and its `sha`
pub fn pull_request(location: &Location, options: &Options) -> Result<HttpRequest> {
    let url = location.api_url_at_branch()?;
    Ok(authorize(HttpRequest::new(Method::Get, url.as_str()), options))
}

/// Decode a contents response
pub fn parse_blob(location: &Location, response: &HttpResponse) -> Result<Blob> {
    let value: Value = response.json()?;
    if value.is_array() {
        return Err(Error::invalid_location(format!("{} is a directory", location)));
    }
    let contents: Contents = serde_json::from_value(value).map_err(|e| Error::Transport {
        status: Some(response.status),
        reason: format!("unexpected contents response: {}", e),
    })?;
    if contents.kind.as_deref().is_some_and(|kind| kind != "file") {
        return Err(Error::invalid_location(format!("{} is not a file", location)));
    }
    // Files over 1 MB come back without inline content.
    if contents.encoding.as_deref() == Some("none") {
        return Err(Error::UnreadableContent {
            reason: format!("{} is too large for the contents API", location),
        });
    }
    Ok(Blob {
        content: decode_base64(&contents.content)?,
        revision: RevisionToken::new(contents.sha),
    })
}

/// Request for the raw file text
pub fn fetch_request(location: &Location, options: &Options) -> Result<HttpRequest> {
    let url = location.raw_url()?;
    Ok(authorize(HttpRequest::new(Method::Get, url.as_str()), options))
}

/// Create or update request; `revision` is the `sha` of the file being
/// replaced
pub fn put_request(
    location: &Location,
    options: &Options,
    content: &str,
    revision: Option<&RevisionToken>,
) -> Result<HttpRequest> {
    let mut body = commit_body(location, options);
    body["content"] = Value::String(encode_base64(content));
    if let Some(sha) = revision {
        body["sha"] = Value::String(sha.to_string());
    }
    let url = location.api_url()?;
    Ok(authorize(HttpRequest::new(Method::Put, url.as_str()), options).json(body))
}

/// Delete request; GitHub needs the current `sha`
pub fn delete_request(
    location: &Location,
    options: &Options,
    revision: &RevisionToken,
) -> Result<HttpRequest> {
    let mut body = commit_body(location, options);
    body["sha"] = Value::String(revision.to_string());
    let url = location.api_url()?;
    Ok(authorize(HttpRequest::new(Method::Delete, url.as_str()), options).json(body))
}

/// Read the new blob `sha` from a put or delete response
pub fn parse_commit(response: &HttpResponse) -> Commit {
    let revision = response
        .json::<Value>()
        .ok()
        .and_then(|body| body["content"]["sha"].as_str().map(RevisionToken::new));
    Commit {
        status: response.status,
        revision,
    }
}
