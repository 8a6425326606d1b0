//! Session configuration
//!
//! [`Options`] holds everything an operation needs besides its arguments:
//! location defaults, credentials, commit metadata, tabular options and the
//! schema-strictness settings.
//!
//! Options are an immutable value. Every facade operation borrows them to
//! build its [`Location`](crate::Location); changing a setting means building
//! a new value with one of the `with_*` methods, and resetting means
//! `Options::default()`.
//!
//! Options can be loaded from TOML. Any subset of keys may be given; the rest
//! keep their defaults:
//!
//! ```toml
//! namespace = "gitlab"
//! owner = "acme"
//! repo = "datasets"
//! branch = "main"
//! token = "glpat-..."
//! strict = true
//! default = "n/a"
//!
//! [csv]
//! delimiter = ";"
//! ```

use crate::error::{Error, Result};
use crate::location::Provider;
use crate::record::Format;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;

/// Default branch used when neither the location nor the options name one
pub const DEFAULT_BRANCH: &str = "master";

/// Default commit message for pushes
pub const DEFAULT_MESSAGE: &str = "repotable update";

/// Default identifier column used by `remove` and single-record locations
pub const DEFAULT_ID_COLUMN: &str = "id";

/// Commit author identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Display name
    pub name: String,
    /// E-mail address
    pub email: String,
}

impl Default for Author {
    fn default() -> Self {
        Self {
            name: "repotable".to_string(),
            email: "repotable@users.noreply.github.com".to_string(),
        }
    }
}

/// Tabular-notation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabularOptions {
    /// Field delimiter; must be a single ASCII character
    pub delimiter: char,
}

impl Default for TabularOptions {
    fn default() -> Self {
        Self { delimiter: ',' }
    }
}

impl TabularOptions {
    /// The delimiter as a byte, rejecting non-ASCII characters
    pub fn delimiter_byte(&self) -> Result<u8> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(Error::Config {
                reason: format!(
                    "csv delimiter must be a single ASCII character, got {:?}",
                    self.delimiter
                ),
            })
        }
    }
}

/// Session configuration, merged over documented defaults.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    /// Forge provider
    pub namespace: Provider,
    /// Server host for self-hosted forges (e.g. `gitlab.example.com`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    /// Repository owner (user, organisation or group)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Repository name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    /// Branch to read from and commit to
    pub branch: String,
    /// File path inside the repository
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// User name for basic authentication (GitHub)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Access token; required by every write
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Commit message for pushes
    pub message: String,
    /// Enforce a fixed column set across appended records
    pub strict: bool,
    /// Fill value for columns missing under strict mode
    #[serde(rename = "default", skip_serializing_if = "Value::is_null")]
    pub default_value: Value,
    /// Known column set for strict mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    /// Force the encode format instead of the detected one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<Format>,
    /// Field holding record identifiers
    pub id_column: String,
    /// Commit author
    pub author: Author,
    /// Tabular-notation settings
    pub csv: TabularOptions,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            namespace: Provider::GitHub,
            server: None,
            owner: None,
            repo: None,
            branch: DEFAULT_BRANCH.to_string(),
            path: None,
            user: None,
            token: None,
            message: DEFAULT_MESSAGE.to_string(),
            strict: false,
            default_value: Value::Null,
            columns: None,
            format: None,
            id_column: DEFAULT_ID_COLUMN.to_string(),
            author: Author::default(),
            csv: TabularOptions::default(),
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("namespace", &self.namespace)
            .field("server", &self.server)
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("path", &self.path)
            .field("user", &self.user)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("message", &self.message)
            .field("strict", &self.strict)
            .field("default_value", &self.default_value)
            .field("columns", &self.columns)
            .field("format", &self.format)
            .field("id_column", &self.id_column)
            .field("author", &self.author)
            .field("csv", &self.csv)
            .finish()
    }
}

impl Options {
    // =========================================================================
    // Builders
    // =========================================================================

    /// Set the forge provider
    pub fn with_namespace(mut self, namespace: Provider) -> Self {
        self.namespace = namespace;
        self
    }

    /// Set the server host
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    /// Set the repository owner and name
    pub fn with_repository(mut self, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self.repo = Some(repo.into());
        self
    }

    /// Set the branch
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    /// Set the default file path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set credentials. `user` is only used for GitHub basic auth.
    pub fn with_credentials(mut self, user: Option<String>, token: impl Into<String>) -> Self {
        self.user = user;
        self.token = Some(token.into());
        self
    }

    /// Set the commit message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Set the commit author
    pub fn with_author(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.author = Author {
            name: name.into(),
            email: email.into(),
        };
        self
    }

    /// Set the tabular delimiter
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.csv.delimiter = delimiter;
        self
    }

    /// Enable or disable strict mode with the given fill value
    pub fn with_strict(mut self, strict: bool, default_value: Value) -> Self {
        self.strict = strict;
        self.default_value = default_value;
        self
    }

    /// Remember a column set for strict mode
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }

    /// Force an encode format
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    /// Set the identifier column
    pub fn with_id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = column.into();
        self
    }

    /// True if a token is configured
    pub fn has_credentials(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    // =========================================================================
    // TOML
    // =========================================================================

    /// Returns a commented template whose values are the defaults.
    pub fn default_toml() -> &'static str {
        r#"# repotable session configuration
#
# Forge provider: "github" (default) or "gitlab"
namespace = "github"

# Self-hosted server host, e.g. "gitlab.example.com"
# server = "gitlab.example.com"

# Repository coordinates; a location string may override them
# owner = "acme"
# repo = "datasets"
branch = "master"
# path = "data/people.json"

# Credentials; every write needs a token
# user = "octocat"
# token = "ghp_..."

# Commit metadata
message = "repotable update"

# Strict mode keeps the column set stable across appends.
strict = false
# default = "n/a"
# columns = ["id", "name"]

# Force an encode format instead of the detected one: "json" or "csv"
# format = "csv"

# Field holding record identifiers
id_column = "id"

[author]
name = "repotable"
email = "repotable@users.noreply.github.com"

[csv]
delimiter = ","
"#
    }

    /// Parse options from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let options: Options = toml::from_str(content).map_err(|e| Error::Config {
            reason: format!("failed to parse options: {}", e),
        })?;
        options.csv.delimiter_byte()?;
        Ok(options)
    }

    /// Read and parse options from a file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            reason: format!("failed to read options file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// Serialize to TOML and write to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config {
            reason: format!("failed to serialize options: {}", e),
        })?;
        std::fs::write(path, content).map_err(|e| Error::Config {
            reason: format!("failed to write options file '{}': {}", path.display(), e),
        })
    }
}
