use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub message: String,
}

/// Result of an admin check for the calling principal
#[derive(Debug, Serialize, Deserialize)]
pub struct WhoAmIResponse {
    pub kind: String,
    pub name: Option<String>,
    pub database: String,
    pub is_admin: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvalidateResponse {
    pub identity: String,
    pub removed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClearResponse {
    pub removed: usize,
}
