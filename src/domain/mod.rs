pub mod id;
pub mod logic;
pub mod models;
