use bastion::{AccessDecisionEngine, AnonymousAccessMode};
use std::sync::Arc;

/// Server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AccessDecisionEngine>,
    pub anonymous_access: AnonymousAccessMode,
}

impl AppState {
    pub fn new(engine: Arc<AccessDecisionEngine>, anonymous_access: AnonymousAccessMode) -> Self {
        Self {
            engine,
            anonymous_access,
        }
    }
}
