pub mod responses;

pub use responses::{ClearResponse, HealthResponse, InvalidateResponse, WhoAmIResponse};
