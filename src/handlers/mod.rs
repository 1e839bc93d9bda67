pub mod registration_handler;
pub mod signup_form;
