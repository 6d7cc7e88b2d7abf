use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Row of the `profiles` table, keyed by the auth user id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    #[serde(default)]
    pub is_admin: bool,
}
