use serde::{Deserialize, Serialize};

/// Explicit tenant context threaded through every router and orchestrator
/// call. Identity resolution happens at the HTTP edge; nothing below it
/// reads ambient state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgContext {
    pub organization_id: String,
}

impl OrgContext {
    #[must_use]
    pub fn new(organization_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
        }
    }
}
