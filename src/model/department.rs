use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Department {
    pub id: u64,
    pub name: String,
    /// Opted in to the auto-absent sweep
    pub auto_mark_absent: bool,
}
