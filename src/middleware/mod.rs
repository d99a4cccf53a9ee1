pub mod auth;
pub mod guard;
pub mod response;

pub use auth::{access_token_middleware, AuthUser};
pub use guard::permission_guard;
pub use response::{ApiResponse, ApiResult};
