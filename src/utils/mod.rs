pub mod password;
pub mod time_parser;
pub mod token;
pub mod url_validator;

pub use time_parser::TimeParser;
pub use token::{RandomTokenGenerator, TokenGenerator, is_valid_token};
