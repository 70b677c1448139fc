pub mod extractors;
pub mod password;
pub mod token;

pub use extractors::AuthUser;
pub use token::{Claims, TokenError, TokenKeys, TokenPurpose};
