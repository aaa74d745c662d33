//! Error types for pgcompose

use thiserror::Error;

/// Result type alias for pgcompose operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Errors raised while declaring schemas, composing statements or executing them.
///
/// Declaration, composition and compile errors are programmer-facing and never
/// retried. Execution errors come from the driver and are passed through as-is.
#[derive(Debug, Error)]
pub enum OrmError {
    /// Fragment template slot count does not match its arguments or parameters
    #[error("Template arity error: {0}")]
    TemplateArity(String),

    /// Right-hand operand of a comparison has an unsupported type
    #[error("Comparison type error: {0}")]
    ComparisonType(String),

    /// Value cannot be assigned to a column
    #[error("Assignment type error: {0}")]
    AssignmentType(String),

    /// Invalid column declaration (bad default, bounds, precision, ...)
    #[error("Column declaration error: {0}")]
    ColumnDeclaration(String),

    /// Value has the right type but breaks a column constraint
    #[error("Column value validation error: {0}")]
    ColumnValueValidation(String),

    /// Array column declared with an array element type
    #[error("Nested array error: {0}")]
    NestedArray(String),

    /// Operand shape does not fit the operator (e.g. a scalar for IN)
    #[error("Filter comparison error: {0}")]
    FilterComparison(String),

    /// JOIN ... ON expression does not reference the joined table properly
    #[error("Join ON comparison error: {0}")]
    OnJoinComparison(String),

    /// UPDATE/DELETE without WHERE and without `force()`
    #[error("Unsafe statement: {0}")]
    UnsafeStatement(String),

    /// Result row does not line up with the statement's alias registry
    #[error("Query result lookup error: {0}")]
    QueryResultLookup(String),

    /// Generic validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),
}

impl OrmError {
    /// Create a template arity error
    pub fn template_arity(message: impl Into<String>) -> Self {
        Self::TemplateArity(message.into())
    }

    /// Create a comparison type error
    pub fn comparison_type(message: impl Into<String>) -> Self {
        Self::ComparisonType(message.into())
    }

    /// Create an assignment type error
    pub fn assignment_type(message: impl Into<String>) -> Self {
        Self::AssignmentType(message.into())
    }

    /// Create a column declaration error
    pub fn declaration(message: impl Into<String>) -> Self {
        Self::ColumnDeclaration(message.into())
    }

    /// Create a column value validation error
    pub fn value_validation(message: impl Into<String>) -> Self {
        Self::ColumnValueValidation(message.into())
    }

    /// Create a join ON comparison error
    pub fn on_join(message: impl Into<String>) -> Self {
        Self::OnJoinComparison(message.into())
    }

    /// Create an unsafe statement error
    pub fn unsafe_statement(message: impl Into<String>) -> Self {
        Self::UnsafeStatement(message.into())
    }

    /// Create a result lookup error
    pub fn result_lookup(message: impl Into<String>) -> Self {
        Self::QueryResultLookup(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Errors raised while declaring tables and columns.
    pub fn is_declaration(&self) -> bool {
        matches!(
            self,
            Self::ColumnDeclaration(_) | Self::NestedArray(_) | Self::Validation(_)
        )
    }

    /// Errors raised while composing expressions and statements.
    pub fn is_composition(&self) -> bool {
        matches!(
            self,
            Self::ComparisonType(_)
                | Self::AssignmentType(_)
                | Self::ColumnValueValidation(_)
                | Self::FilterComparison(_)
                | Self::OnJoinComparison(_)
        )
    }

    /// Check if this is an unsafe statement error
    pub fn is_unsafe_statement(&self) -> bool {
        matches!(self, Self::UnsafeStatement(_))
    }

    /// Check if this error came from the database driver or pool
    pub fn is_execution(&self) -> bool {
        #[cfg(feature = "pool")]
        if matches!(self, Self::Pool(_)) {
            return true;
        }
        matches!(
            self,
            Self::Query(_) | Self::Connection(_) | Self::Decode { .. }
        )
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for OrmError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert!(OrmError::declaration("x").is_declaration());
        assert!(OrmError::NestedArray("x".into()).is_declaration());
        assert!(OrmError::comparison_type("x").is_composition());
        assert!(OrmError::on_join("x").is_composition());
        assert!(OrmError::unsafe_statement("x").is_unsafe_statement());
        assert!(OrmError::decode("id", "bad").is_execution());
        assert!(!OrmError::template_arity("x").is_execution());
    }

    #[test]
    fn test_error_display() {
        let err = OrmError::decode("name", "unexpected type");
        assert_eq!(
            err.to_string(),
            "Decode error on column 'name': unexpected type"
        );
        assert_eq!(
            OrmError::unsafe_statement("UPDATE users").to_string(),
            "Unsafe statement: UPDATE users"
        );
    }
}
