pub mod cookies;
pub mod extractor;
pub mod jwt;
pub mod password;
