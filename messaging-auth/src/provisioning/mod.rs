//! Messaging account provisioning.

mod users;

pub use users::{UserDirectory, UserEntity};
