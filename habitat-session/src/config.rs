use serde::{Deserialize, Serialize};

/// What happens to the selection when a selected entity is deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Keep the deleted entity selected; only its list refreshes.
    #[default]
    Retain,
    /// Deselect the deleted entity's level and everything below it.
    ClearSelection,
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub delete_policy: DeletePolicy,
    /// Pending `submit` calls before callers wait.
    pub command_buffer: usize,
    /// Queued subscription deliveries before forwarders wait.
    pub delivery_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            delete_policy: DeletePolicy::Retain,
            command_buffer: 32,
            delivery_buffer: 64,
        }
    }
}
