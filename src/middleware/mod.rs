pub mod auth;
pub mod upload_form;
