mod fetch;
mod health;
mod status;
mod validate;

pub use fetch::run_fetch;
pub use health::run_health;
pub use status::run_status;
pub use validate::run_validate;
