pub mod audit;
pub mod roles;
pub mod session;
pub mod settings;
pub mod users;
