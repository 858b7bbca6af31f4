pub mod amount;
pub mod client;
pub mod processor;
pub mod selection;
pub mod staging;
pub mod state;
pub mod store;
pub mod text_extraction;
