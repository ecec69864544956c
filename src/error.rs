use gradcheck_table::TableError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GradCheckError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error(
        "Gradient table mismatch: {representation} table has {entries} entries but the image has {volumes} volumes"
    )]
    GradientTableMismatch {
        representation: String,
        entries: usize,
        volumes: usize,
    },

    #[error("Options {first} and {second} are mutually exclusive")]
    MutuallyExclusiveOption { first: String, second: String },

    #[error("Could not find executable '{executable}'. Install MRtrix3 or set {env_var}")]
    ToolNotFound {
        executable: String,
        env_var: String,
    },

    #[error(
        "External command failed: {executable} {} (status={status:?}, stderr='{}')",
        args.join(" "),
        stderr.trim()
    )]
    ExternalTool {
        executable: String,
        args: Vec<String>,
        status: Option<i32>,
        stderr: String,
    },

    #[error("{context} '{}': {source}", path.display())]
    Io {
        context: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not parse {context}: {message}")]
    Parse { context: String, message: String },
}

impl GradCheckError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn mutually_exclusive(first: &str, second: &str) -> Self {
        Self::MutuallyExclusiveOption {
            first: first.to_string(),
            second: second.to_string(),
        }
    }

    pub fn io(context: &str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.to_string(),
            path: path.into(),
            source,
        }
    }

    /// Whether the failure came from an external command rather than local validation.
    pub fn is_external_tool(&self) -> bool {
        matches!(self, Self::ToolNotFound { .. } | Self::ExternalTool { .. })
    }
}

impl From<TableError> for GradCheckError {
    fn from(err: TableError) -> Self {
        match err {
            TableError::CountMismatch {
                representation,
                entries,
                volumes,
            } => Self::GradientTableMismatch {
                representation: representation.to_string(),
                entries,
                volumes,
            },
            TableError::Io { path, source } => Self::Io {
                context: "Could not access gradient file".to_string(),
                path,
                source,
            },
            TableError::Parse { origin, message } => Self::Parse {
                context: format!("gradient table {origin}"),
                message,
            },
        }
    }
}
