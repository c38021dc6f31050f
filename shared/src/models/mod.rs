//! Domain models shared by the marketplace backend and its clients

pub mod role;
pub mod user;

pub use role::{Role, RoleQuery, UnknownRole};
pub use user::UserRecord;
