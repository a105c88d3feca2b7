pub mod claude;
pub mod message;
pub mod provider;
