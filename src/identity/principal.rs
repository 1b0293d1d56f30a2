use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The subset of a user row attached to a request after authentication.
/// Owned by the current request; never cached or shared across requests.
/// Serializes as the `user` object of API responses, so it must never grow a
/// password field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct Identity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}
