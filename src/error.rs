use thiserror::Error;

/// Application-level error carrying the process exit code.
///
/// Exit codes:
/// - `2`: usage, configuration or local IO problems
/// - `3`: analysis errors (bad shapes, ranks, degenerate inputs)
/// - `4`: remote fetch failures
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Errors raised by the numerical core (residuals, decomposition, outer products).
///
/// All of these indicate bad input rather than transient conditions; nothing
/// in the core retries or substitutes defaults.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("degenerate range: all entries equal {value}, cannot rescale to [0, 1]")]
    DegenerateRange { value: f64 },
    #[error("invalid rank k={k}: must satisfy 1 <= k < min(rows, cols) = {limit}")]
    InvalidRank { k: usize, limit: usize },
    #[error("insufficient samples on {axis} axis: need at least 2, got {len}")]
    InsufficientSamples { axis: &'static str, len: usize },
}

impl AnalysisError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        AnalysisError::InvalidInput(message.into())
    }
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        AppError::new(3, err.to_string())
    }
}
