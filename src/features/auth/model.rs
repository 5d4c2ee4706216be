use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Identity attached to a request after bearer-token validation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub email: String,
}
