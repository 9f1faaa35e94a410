pub mod conversations;
pub mod error;
pub mod messages;
pub mod models;
pub mod state;

pub use error::ApiError;
pub use state::AppState;
