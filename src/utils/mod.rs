pub mod auth;
pub mod documents;
pub mod identity;
pub mod validation;
