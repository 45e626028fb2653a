use thiserror::Error;

/// Orca build error types
#[derive(Error, Debug)]
pub enum BuildError {
    /// Malformed build script, bad instruction arguments, or bad variable syntax
    #[error("Format error: {0}")]
    FormatError(String),

    /// An external tool exited unsuccessfully
    #[error("Subprocess error: {command} failed with {status}")]
    SubprocessError { command: String, status: String },

    /// Symlink resolution exceeded the dereference limit
    #[error("Too many levels of symbolic links: {path}")]
    SymlinkLoop { path: String },

    /// Path that cannot be handled (e.g. not valid UTF-8)
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A build step failed; wraps the underlying cause with step context
    #[error("Step {index} ({command}): {source}")]
    StepFailed {
        index: usize,
        command: String,
        #[source]
        source: Box<BuildError>,
    },
}

impl BuildError {
    /// Whether this error (or the one it wraps) is a script format error.
    pub fn is_format_error(&self) -> bool {
        match self {
            BuildError::FormatError(_) => true,
            BuildError::StepFailed { source, .. } => source.is_format_error(),
            _ => false,
        }
    }

    /// Whether this error (or the one it wraps) comes from an external tool.
    pub fn is_subprocess_error(&self) -> bool {
        match self {
            BuildError::SubprocessError { .. } => true,
            BuildError::StepFailed { source, .. } => source.is_subprocess_error(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for BuildError {
    fn from(err: serde_json::Error) -> Self {
        BuildError::SerializationError(err.to_string())
    }
}

/// Result type alias for orca build operations
pub type Result<T> = std::result::Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_display() {
        let error = BuildError::FormatError("unknown build command frob".to_string());
        assert_eq!(
            error.to_string(),
            "Format error: unknown build command frob"
        );
    }

    #[test]
    fn test_subprocess_error_display() {
        let error = BuildError::SubprocessError {
            command: "umoci gc --layout=/tmp/x".to_string(),
            status: "exit status: 1".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Subprocess error: umoci gc --layout=/tmp/x failed with exit status: 1"
        );
    }

    #[test]
    fn test_symlink_loop_display() {
        let error = BuildError::SymlinkLoop {
            path: "/ctx/loop".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Too many levels of symbolic links: /ctx/loop"
        );
    }

    #[test]
    fn test_step_failed_display_and_kind() {
        let error = BuildError::StepFailed {
            index: 3,
            command: "user".to_string(),
            source: Box::new(BuildError::FormatError("USER takes one argument".to_string())),
        };
        assert_eq!(
            error.to_string(),
            "Step 3 (user): Format error: USER takes one argument"
        );
        assert!(error.is_format_error());
        assert!(!error.is_subprocess_error());
    }

    #[test]
    fn test_subprocess_kind_through_step() {
        let error = BuildError::StepFailed {
            index: 1,
            command: "run".to_string(),
            source: Box::new(BuildError::SubprocessError {
                command: "runc run".to_string(),
                status: "exit status: 2".to_string(),
            }),
        };
        assert!(error.is_subprocess_error());
        assert!(!error.is_format_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let build_error: BuildError = io_error.into();
        assert!(matches!(build_error, BuildError::IoError(_)));
        assert!(build_error.to_string().contains("file not found"));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_str = "{ invalid json }";
        let result: std::result::Result<serde_json::Value, _> = serde_json::from_str(json_str);
        let json_error = result.unwrap_err();
        let build_error: BuildError = json_error.into();
        assert!(matches!(build_error, BuildError::SerializationError(_)));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<i32> {
            Ok(42)
        }

        fn returns_err() -> Result<i32> {
            Err(BuildError::ConfigError("test error".to_string()))
        }

        assert_eq!(returns_ok().unwrap(), 42);
        assert!(returns_err().is_err());
    }
}
