pub use super::users::Entity as Users;
pub use super::videos::Entity as Videos;
