pub mod client;
pub mod listing;
pub mod quote;
pub mod tenant;
