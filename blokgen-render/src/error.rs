//! Error type for TypeScript compilation.

use thiserror::Error;

/// Why a schema fragment could not be turned into a declaration.
///
/// `path` is a JSON-pointer-like location inside the fragment (`#/properties/body/items`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("invalid type name `{name}`")]
    InvalidName { name: String },

    #[error("{path}: unsupported type `{ty}`")]
    UnsupportedType { path: String, ty: String },

    #[error("{path}: {message}")]
    Malformed { path: String, message: String },
}

impl CompileError {
    pub(crate) fn malformed(path: &str, message: impl Into<String>) -> Self {
        CompileError::Malformed {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

pub type CompileResult<T> = Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::CompileError;

    #[test]
    fn display_includes_location() {
        let err = CompileError::UnsupportedType {
            path: "#/properties/x".to_string(),
            ty: "color".to_string(),
        };
        assert_eq!(err.to_string(), "#/properties/x: unsupported type `color`");
    }
}
