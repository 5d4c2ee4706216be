pub mod auth;
pub mod generation;
pub mod images;
pub mod prompts;
pub mod users;
