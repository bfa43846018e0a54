pub mod form;
pub mod multipart;
pub mod public_url;
pub mod validation;
