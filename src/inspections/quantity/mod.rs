pub mod boxes;
pub mod models;
