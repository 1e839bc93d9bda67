pub mod profile_model;
pub mod registration_model;
