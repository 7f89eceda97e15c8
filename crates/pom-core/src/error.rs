//! Errors produced while building, merging and resolving POM models.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PomError {
    #[error("Failed to parse POM XML: {message}")]
    XmlParse { message: String },

    #[error("Malformed POM at '{path}': {message}")]
    MalformedModel { path: String, message: String },

    #[error("Parent POM '{parent}' of '{child}' could not be located")]
    UnresolvedParent { parent: String, child: String },

    #[error("Cyclic parent inheritance: {}", chain.join(" -> "))]
    CyclicInheritance { chain: Vec<String> },

    #[error("Circular property reference: {}", cycle.join(" -> "))]
    CircularPropertyReference { cycle: Vec<String> },

    #[error("Resolution limit exceeded: {limit} of {max} (reached {value})")]
    ResolutionLimitExceeded {
        limit: &'static str,
        max: usize,
        value: usize,
    },

    #[error("POM for '{coordinates}' (required by '{requested_by}') could not be located")]
    UnresolvedArtifact {
        coordinates: String,
        requested_by: String,
    },

    #[error("Invalid resolver configuration: {message}")]
    Config { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PomError>;

impl PomError {
    pub(crate) fn malformed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedModel {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether this error means a POM could not be obtained at all, as opposed
    /// to a POM that was obtained but is invalid.
    ///
    /// Lenient resolution only tolerates the former.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            Self::UnresolvedParent { .. } | Self::UnresolvedArtifact { .. } | Self::Io(_)
        )
    }
}

impl From<quick_xml::Error> for PomError {
    fn from(err: quick_xml::Error) -> Self {
        Self::XmlParse {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for PomError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config {
            message: err.to_string(),
        }
    }
}
