pub mod context;
pub mod extract;
pub mod profiles;
pub mod session;
