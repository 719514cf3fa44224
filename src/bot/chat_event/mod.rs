pub mod badges;
pub mod chat_event;
