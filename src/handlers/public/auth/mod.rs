pub mod codes;
pub mod login;
pub mod refresh;
pub mod register;
pub mod utils;

pub use codes::{reset_password, send_code, verify_code};
pub use login::login;
pub use refresh::refresh;
pub use register::register;
