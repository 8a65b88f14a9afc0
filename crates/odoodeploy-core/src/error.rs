use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("This command must be run as root (effective uid {euid})")]
    Privilege { euid: u32 },

    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("`{command}` failed ({}): {stderr}", exit_label(.code))]
    ExternalTool {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Step '{step}' failed")]
    StepFailed {
        step: String,
        #[source]
        source: Box<AppError>,
    },

    /// Part of a removal went through before a later command failed.
    #[error("{done}, but {cause}")]
    Incomplete { done: String, cause: Box<AppError> },

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Peel off `StepFailed` wrappers.
    pub fn root_cause(&self) -> &AppError {
        match self {
            AppError::StepFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit status {c}"),
        None => "could not be started".into(),
    }
}
