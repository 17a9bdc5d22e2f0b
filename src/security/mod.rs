//! Credentials and the session guard.
//!
//! The bearer token is issued by the account service and attached to every
//! outgoing call. This module owns where it lives and when it is thrown away.

mod credentials;
mod session;

pub use credentials::{
    Credential, CredentialError, CredentialResult, FileTokenStore, KeyringTokenStore,
    MemoryTokenStore, TokenStore,
};
pub use session::{Route, Session, SignOutReason};
