pub mod cooldown;
pub mod rate_window;
