//! Structured errors for feature assembly.
//!
//! Every variant is fatal: the orchestrator never catches or retries, the
//! first error aborts the whole run and bubbles up to the host's boot code.

use thiserror::Error;

/// Coarse classification of [`AssemblyError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ParameterViolation,
    InvalidKey,
    Conflict,
    ContractConflict,
    ContractViolation,
    UnknownAspectKey,
    FeatureContentInvalid,
    DuplicateFeatureName,
    DuplicateAspectName,
    ReservedWord,
    ExtensionConflict,
    AspectConfigInvalid,
    Hook,
}

#[derive(Debug, Error)]
pub enum AssemblyError {
    /// Malformed call to a public factory or function.
    #[error("{func}() parameter violation: {message}")]
    ParameterViolation { func: &'static str, message: String },

    #[error("invalid resource key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("resource '{key}' (defined by feature '{feature}') is NOT unique: it was previously defined by feature '{prior}'")]
    DuplicateResource {
        key: String,
        feature: String,
        prior: String,
    },

    #[error("resource '{key}' (defined by feature '{feature}') conflicts at '{segment}': {reason}")]
    PathConflict {
        key: String,
        segment: String,
        feature: String,
        reason: &'static str,
    },

    #[error("usage contract '{pattern}' declared by feature '{feature}' specifies a different value type than feature '{existing}'")]
    ContractConflict {
        pattern: String,
        existing: String,
        feature: String,
    },

    #[error("usage contract violation: {message}")]
    ContractViolation { message: String },

    #[error("feature '{feature}' references key '{key}' which is not owned by any supplied aspect")]
    UnknownAspectKey { feature: String, key: String },

    #[error("feature '{feature}' has invalid '{aspect}' content: {message}")]
    FeatureContentInvalid {
        feature: String,
        aspect: String,
        message: String,
    },

    #[error("feature name '{0}' is supplied more than once")]
    DuplicateFeatureName(String),

    #[error("aspect name '{0}' is supplied more than once")]
    DuplicateAspectName(String),

    #[error("'{word}' is a reserved word and cannot be used as {context}")]
    ReservedWord { word: String, context: &'static str },

    #[error("feature key '{key}' requested by '{owner}' is already owned by '{existing_owner}'")]
    ExtensionConflict {
        key: String,
        owner: String,
        existing_owner: String,
    },

    #[error("aspect '{aspect}' rejected its own configuration: {message}")]
    AspectConfigInvalid { aspect: String, message: String },

    // Phase errors with aspect/feature context
    #[error("deferred content expansion failed for feature '{feature}' ({aspect})")]
    Expansion {
        feature: String,
        aspect: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("aspect '{aspect}' failed to gather feature content")]
    Gather {
        aspect: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("aspect '{aspect}' failed to cross-link with other aspects")]
    CrossLink {
        aspect: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("root composition failed in '{name}'")]
    Compose {
        name: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("early initialization failed for feature '{feature}'")]
    Init {
        feature: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("after-start hook failed for feature '{feature}'")]
    AfterStart {
        feature: String,
        #[source]
        source: anyhow::Error,
    },
}

impl AssemblyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ParameterViolation { .. } => ErrorKind::ParameterViolation,
            Self::InvalidKey { .. } => ErrorKind::InvalidKey,
            Self::DuplicateResource { .. } | Self::PathConflict { .. } => ErrorKind::Conflict,
            Self::ContractConflict { .. } => ErrorKind::ContractConflict,
            Self::ContractViolation { .. } => ErrorKind::ContractViolation,
            Self::UnknownAspectKey { .. } => ErrorKind::UnknownAspectKey,
            Self::FeatureContentInvalid { .. } => ErrorKind::FeatureContentInvalid,
            Self::DuplicateFeatureName(_) => ErrorKind::DuplicateFeatureName,
            Self::DuplicateAspectName(_) => ErrorKind::DuplicateAspectName,
            Self::ReservedWord { .. } => ErrorKind::ReservedWord,
            Self::ExtensionConflict { .. } => ErrorKind::ExtensionConflict,
            Self::AspectConfigInvalid { .. } => ErrorKind::AspectConfigInvalid,
            Self::Expansion { .. }
            | Self::Gather { .. }
            | Self::CrossLink { .. }
            | Self::Compose { .. }
            | Self::Init { .. }
            | Self::AfterStart { .. } => ErrorKind::Hook,
        }
    }

    pub(crate) fn parameter(func: &'static str, message: impl Into<String>) -> Self {
        Self::ParameterViolation {
            func,
            message: message.into(),
        }
    }
}

pub type AssemblyResult<T> = Result<T, AssemblyError>;
