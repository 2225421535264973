/// Result type used by the engine crate.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors produced by engine commands and configuration loading.
///
/// Stale ids and out-of-order gestures are not errors: the engine treats
/// them as expected races with its collaborators and ignores them.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("non-finite value for {field}: {value}")]
    NonFiniteInput { field: &'static str, value: f64 },

    #[error("invalid engine config: {reason}")]
    InvalidConfig { reason: String },

    #[error("engine config could not be parsed ({0})")]
    ConfigParse(#[from] serde_json::Error),
}

/// Returns `value` unchanged when finite, otherwise a `NonFiniteInput` error.
pub(crate) fn ensure_finite(field: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EngineError::NonFiniteInput { field, value })
    }
}
