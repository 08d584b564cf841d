use std::fmt;

#[derive(Debug, Clone)]
pub(crate) enum RuntimeError {
    DaemonUnreachable(String),
    BuildFailure { message: String, tail: Vec<String> },
    NotFound(String),
    Transient(String),
    InstanceCreationFailed(String),
    FileSystemError(String),
}

impl RuntimeError {
    pub(crate) fn is_not_found(&self) -> bool {
        matches!(self, RuntimeError::NotFound(_))
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::DaemonUnreachable(msg) => write!(f, "Container runtime unreachable: {}", msg),
            RuntimeError::BuildFailure { message, tail } => {
                write!(f, "Image build failed: {}", message)?;
                if !tail.is_empty() {
                    write!(f, "\n{}", tail.join("\n"))?;
                }
                Ok(())
            }
            RuntimeError::NotFound(msg) => write!(f, "Not found: {}", msg),
            RuntimeError::Transient(msg) => write!(f, "Runtime error: {}", msg),
            RuntimeError::InstanceCreationFailed(msg) => {
                write!(f, "Instance creation failed: {}", msg)
            }
            RuntimeError::FileSystemError(msg) => write!(f, "File system error: {}", msg),
        }
    }
}

impl std::error::Error for RuntimeError {}

impl From<std::io::Error> for RuntimeError {
    fn from(err: std::io::Error) -> Self {
        RuntimeError::FileSystemError(format!("{}", err))
    }
}

impl From<serde_json::Error> for RuntimeError {
    fn from(err: serde_json::Error) -> Self {
        RuntimeError::Transient(format!("JSON parsing error: {}", err))
    }
}
