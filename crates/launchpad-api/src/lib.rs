pub mod auth;
pub mod error;
pub mod extract;
pub mod identity;
pub mod messages;
pub mod middleware;
pub mod notifications;
pub mod password;
pub mod projects;
pub mod routes;
pub mod state;
pub mod tokens;
pub mod users;

pub use error::ApiError;
pub use routes::router;
pub use state::{AppState, AppStateInner, Settings};
