//! GitLab repository files API
//!
//! | Operation | Request |
//! |-----------|---------|
//! | pull | `GET /projects/{o%2Fr}/repository/files/{path}?ref={branch}` |
//! | fetch | `GET /projects/{o%2Fr}/repository/files/{path}/raw?ref={branch}` |
//! | create | `POST .../files/{path}` |
//! | update | `PUT .../files/{path}` with `last_commit_id` |
//! | delete | `DELETE .../files/{path}` with `last_commit_id` |
//!
//! The revision token is `last_commit_id`. GitLab reports a stale
//! `last_commit_id`, or a create over an existing file, as a 400 with a
//! message; [`conflict`] recognises those.

use crate::encoding::{decode_base64, encode_base64};
use crate::transport::{HttpRequest, HttpResponse, Method};
use repotable_core::{Blob, Commit, Error, Location, Options, Result, RevisionToken};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct FileResponse {
    content: String,
    #[serde(default)]
    encoding: Option<String>,
    last_commit_id: String,
}

fn authorize(request: HttpRequest, options: &Options) -> HttpRequest {
    let request = request.header("User-Agent", crate::USER_AGENT);
    match &options.token {
        Some(token) => request.header("Authorization", format!("Bearer {}", token)),
        None => request,
    }
}

fn commit_body(location: &Location, options: &Options) -> Value {
    json!({
        "branch": location.branch(),
        "commit_message": options.message,
        "author_name": options.author.name,
        "author_email": options.author.email,
    })
}

/// Request for the current file and its `last_commit_id`
pub fn pull_request(location: &Location, options: &Options) -> Result<HttpRequest> {
    let url = location.api_url_at_branch()?;
    Ok(authorize(HttpRequest::new(Method::Get, url.as_str()), options))
}

/// Decode a file response
pub fn parse_blob(response: &HttpResponse) -> Result<Blob> {
    let file: FileResponse = response.json()?;
    let content = match file.encoding.as_deref() {
        Some("base64") | None => decode_base64(&file.content)?,
        Some("text") => file.content,
        Some(other) => {
            return Err(Error::UnreadableContent {
                reason: format!("unsupported content encoding '{}'", other),
            })
        }
    };
    Ok(Blob {
        content,
        revision: RevisionToken::new(file.last_commit_id),
    })
}

/// Request for the raw file text
pub fn fetch_request(location: &Location, options: &Options) -> Result<HttpRequest> {
    let mut url = location.api_url()?;
    url.path_segments_mut()
        .map_err(|_| Error::invalid_location(format!("{} has no API path", location)))?
        .push("raw");
    url.query_pairs_mut().append_pair("ref", location.branch());
    Ok(authorize(HttpRequest::new(Method::Get, url.as_str()), options))
}

/// Create (`revision` is `None`) or update request
pub fn put_request(
    location: &Location,
    options: &Options,
    content: &str,
    revision: Option<&RevisionToken>,
) -> Result<HttpRequest> {
    let mut body = commit_body(location, options);
    body["encoding"] = Value::from("base64");
    body["content"] = Value::String(encode_base64(content));
    let method = match revision {
        Some(last_commit_id) => {
            body["last_commit_id"] = Value::String(last_commit_id.to_string());
            Method::Put
        }
        None => Method::Post,
    };
    let url = location.api_url()?;
    Ok(authorize(HttpRequest::new(method, url.as_str()), options).json(body))
}

/// Delete request, guarded by `last_commit_id` when known
pub fn delete_request(
    location: &Location,
    options: &Options,
    revision: Option<&RevisionToken>,
) -> Result<HttpRequest> {
    let mut body = commit_body(location, options);
    if let Some(last_commit_id) = revision {
        body["last_commit_id"] = Value::String(last_commit_id.to_string());
    }
    let url = location.api_url()?;
    Ok(authorize(HttpRequest::new(Method::Delete, url.as_str()), options).json(body))
}

/// GitLab does not return the new commit id from the files API.
pub fn parse_commit(response: &HttpResponse) -> Commit {
    Commit {
        status: response.status,
        revision: None,
    }
}

/// Recognise a 400 that is really a compare-and-swap rejection.
pub fn conflict(response: &HttpResponse) -> Option<Error> {
    if response.status != 400 {
        return None;
    }
    let message = response
        .json::<Value>()
        .ok()
        .and_then(|body| body["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| response.body.clone());
    let lower = message.to_ascii_lowercase();
    if lower.contains("already exists") || lower.contains("has changed") || lower.contains("changed since") {
        Some(Error::Conflict {
            status: 400,
            reason: message,
        })
    } else {
        None
    }
}
