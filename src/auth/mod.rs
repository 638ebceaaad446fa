//! Authentication system
//!
//! Holds the account registry and the access-rights bitmask checked before
//! each command runs.

pub mod registry;
pub mod rights;

pub use registry::{Account, AccountId, AccountLimits, AccountRegistry};
pub use rights::{AccessRights, Right};
