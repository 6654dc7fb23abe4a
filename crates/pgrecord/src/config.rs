//! Per-table behavior configuration.

/// Default truncation for logged SQL (in bytes).
pub const DEFAULT_MAX_SQL_LENGTH: usize = 200;

/// What `save` does for a persisted record with no assigned columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmptyUpdatePolicy {
    /// Fail with [`OrmError::Precondition`](crate::OrmError::Precondition).
    #[default]
    Reject,
    /// Return `Ok` without touching the database.
    Noop,
}

/// Configuration shared by every record of a table.
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// Behavior of `save` when an update would set nothing.
    pub empty_update: EmptyUpdatePolicy,
    /// Whether assigned primary-key columns are written by UPDATE.
    ///
    /// When `false` they are left out of the SET list even if assigned.
    pub update_primary_key: bool,
    /// Whether statements issued for this table are logged.
    pub log_sql: bool,
    /// Truncate logged SQL (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            empty_update: EmptyUpdatePolicy::Reject,
            update_primary_key: true,
            log_sql: true,
            max_sql_length: Some(DEFAULT_MAX_SQL_LENGTH),
        }
    }
}

impl TableConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the empty-update policy.
    pub fn empty_update(mut self, policy: EmptyUpdatePolicy) -> Self {
        self.empty_update = policy;
        self
    }

    /// Include or skip assigned primary-key columns in UPDATE.
    pub fn update_primary_key(mut self, enabled: bool) -> Self {
        self.update_primary_key = enabled;
        self
    }

    /// Enable or disable SQL logging.
    pub fn log_sql(mut self, enabled: bool) -> Self {
        self.log_sql = enabled;
        self
    }

    /// Set maximum logged SQL length.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }
}
