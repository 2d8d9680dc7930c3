use thiserror::Error;

/// Error type for invalid operations.
///
/// Every variant except [`RGCMError::Error`] is fatal for the step in progress:
/// the step is aborted and the caller's state is left untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RGCMError {
    #[error("{0}")]
    Error(String),
    #[error("Unknown quantity '{name}'. Register it with the quantity registry before using it in a component declaration.")]
    UnknownQuantity { name: String },
    #[error("Unknown constant '{name}'")]
    UnknownConstant { name: String },
    #[error("Missing input '{name}' required by component '{component}'")]
    MissingInput { component: String, name: String },
    #[error("Unit mismatch for quantity '{name}': cannot convert '{from}' to '{to}' ({details})")]
    UnitMismatch {
        name: String,
        from: String,
        to: String,
        details: String,
    },
    #[error("Failed to parse unit '{unit_string}' for quantity '{name}': {details}")]
    UnitParseError {
        name: String,
        unit_string: String,
        details: String,
    },
    #[error("Dimension mismatch for quantity '{name}': expected shape {expected:?} over {dims}, got {actual:?}")]
    DimensionMismatch {
        name: String,
        dims: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error("Component '{component}' did not converge: {details}")]
    Nonconvergence { component: String, details: String },
    #[error("Component '{component}' returned invalid {kind}: missing {missing:?}, undeclared {undeclared:?}")]
    InvalidComponentOutput {
        component: String,
        kind: String,
        missing: Vec<String>,
        undeclared: Vec<String>,
    },
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Convenience type for `Result<T, RGCMError>`.
pub type RGCMResult<T> = Result<T, RGCMError>;
