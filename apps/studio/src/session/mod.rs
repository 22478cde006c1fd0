pub mod cooldown;
pub mod credentials;
pub mod handlers;
pub mod state;
