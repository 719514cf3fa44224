pub mod chunk;
pub mod throttle;
