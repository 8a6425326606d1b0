//! Forge substrate for repotable
//!
//! Stores files through a git forge's file API:
//! - GitHub (github.com and Enterprise): contents API, blob `sha` tokens
//! - GitLab (gitlab.com and self-hosted): repository files API,
//!   `last_commit_id` tokens
//!
//! HTTP goes through the [`Transport`] trait. [`UreqTransport`] is the
//! production implementation; [`ScriptedTransport`] replays canned
//! responses.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod encoding;
pub mod forge;
pub mod github;
pub mod gitlab;
pub mod scripted;
pub mod transport;

pub use encoding::{decode_base64, encode_base64};
pub use forge::ForgeSubstrate;
pub use scripted::ScriptedTransport;
pub use transport::{HttpRequest, HttpResponse, Method, Transport, UreqTransport, DEFAULT_TIMEOUT};

/// `User-Agent` sent with every request (GitHub rejects requests without one)
pub const USER_AGENT: &str = concat!("repotable/", env!("CARGO_PKG_VERSION"));
