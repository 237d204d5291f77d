//! Database configuration.

/// Configuration for a [`SecurityDatabase`](crate::database::SecurityDatabase).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecurityDatabaseConfig {
    /// Record count above which the next allocation evicts the oldest
    /// record. Defaults to 100.
    pub max_records: usize,
    /// Route delete-time connection cleanup through the unified connection
    /// manager instead of the legacy filter accept list. Defaults to false.
    pub unified_connection_manager: bool,
}

impl Default for SecurityDatabaseConfig {
    fn default() -> Self {
        Self {
            max_records: 100,
            unified_connection_manager: false,
        }
    }
}
