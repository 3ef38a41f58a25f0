pub mod handlers;
pub mod token;
pub mod types;

pub use token::TokenConfig;
pub use types::IdentityClaims;
