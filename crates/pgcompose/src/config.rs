use crate::fragment::Placeholder;

/// Options applied when a statement is compiled for execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Placeholder token emitted for bound parameters.
    pub placeholder: Placeholder,
    /// Truncate logged SQL (in bytes). `None` means no truncation.
    pub max_logged_sql: Option<usize>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            placeholder: Placeholder::Format,
            max_logged_sql: Some(200),
        }
    }
}

impl CompileOptions {
    /// Create options with defaults (`%s` placeholders, 200-byte log truncation).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the placeholder style.
    pub fn with_placeholder(mut self, placeholder: Placeholder) -> Self {
        self.placeholder = placeholder;
        self
    }

    /// Set maximum SQL length to log.
    pub fn with_max_logged_sql(mut self, len: usize) -> Self {
        self.max_logged_sql = Some(len);
        self
    }

    /// Disable SQL truncation in logs.
    pub fn no_truncate(mut self) -> Self {
        self.max_logged_sql = None;
        self
    }

    #[cfg_attr(not(feature = "tracing"), allow(dead_code))]
    pub(crate) fn truncate_sql<'a>(&self, sql: &'a str) -> std::borrow::Cow<'a, str> {
        match self.max_logged_sql {
            Some(max) if sql.len() > max => {
                let mut end = max;
                while end > 0 && !sql.is_char_boundary(end) {
                    end -= 1;
                }
                format!("{}...", &sql[..end]).into()
            }
            _ => sql.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_sql() {
        let opts = CompileOptions::new().with_max_logged_sql(6);
        assert_eq!(opts.truncate_sql("SELECT 1"), "SELECT...");
        assert_eq!(opts.truncate_sql("SELECT"), "SELECT");

        // Never splits a multi-byte character.
        let opts = CompileOptions::new().with_max_logged_sql(2);
        assert_eq!(opts.truncate_sql("é1"), "é...");

        assert_eq!(
            CompileOptions::new().no_truncate().truncate_sql("SELECT 1"),
            "SELECT 1"
        );
    }

    #[test]
    fn test_builder() {
        let opts = CompileOptions::new().with_placeholder(Placeholder::Numbered);
        assert_eq!(opts.placeholder, Placeholder::Numbered);
        assert_eq!(opts.max_logged_sql, Some(200));
    }
}
