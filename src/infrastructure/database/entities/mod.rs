//! Database entities module

pub mod contact;
pub mod user;

pub use contact::Entity as Contact;
pub use user::Entity as User;
