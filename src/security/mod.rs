pub mod auth;
pub mod csrf;
pub mod form;
pub mod headers;
pub mod password;
