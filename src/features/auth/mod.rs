pub mod jwt;
pub mod model;

pub use jwt::JwtValidator;
pub use model::AuthenticatedUser;
