pub mod channel_lifecycle;
