//! Password hashing and access tokens

mod password;
mod token;

pub use password::PasswordHasher;
pub use token::{Claims, TokenError, TokenIssuer};
