//! Session identity for the DogScan API: token codec, request authentication
//! gate, and the per-request identity attached after a successful check.
//! Keep the public surface thin and split implementation across sub-modules.

mod authenticator;
mod principal;
mod token;

pub use authenticator::{bearer_token, require_session, TOKEN_COOKIE};
pub use principal::Identity;
pub use token::{Claims, TokenCodec, TokenError, TOKEN_TTL_DAYS};
