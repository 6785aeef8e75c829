//! Databricks workspace authentication.

use reqwest::RequestBuilder;

/// Authentication mode for a Databricks workspace.
///
/// Both modes travel as a bearer token; they are kept apart so config
/// validation and diagnostics can name which one is in play. Minting OAuth
/// tokens is out of scope, a token handed to us is used as-is.
#[derive(Debug, Clone)]
pub enum WorkspaceAuth {
    /// Personal access token (`dapi...`).
    Pat(String),
    /// OAuth access token obtained outside this process.
    OauthToken(String),
}

impl std::fmt::Display for WorkspaceAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pat(_) => write!(f, "pat"),
            Self::OauthToken(_) => write!(f, "oauth_token"),
        }
    }
}

impl WorkspaceAuth {
    pub(crate) fn apply_headers(&self, req: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Pat(token) | Self::OauthToken(token) => req.bearer_auth(token),
        }
    }

    pub(crate) fn token(&self) -> &str {
        match self {
            Self::Pat(token) | Self::OauthToken(token) => token,
        }
    }
}
