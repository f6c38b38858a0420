//! Session tokens, identity resolution and per-resource authorization.

pub mod gate;
pub mod session;
pub mod token;

pub use gate::{Actor, AuthorizationGate, Decision, DenialReason, ResourceScope};
pub use session::{AuthError, Identity, SessionResolver};
pub use token::{decode_unverified, decode_unverified_at, TokenCodec, TokenError, TokenPayload};
