pub mod archive;
pub mod models;
pub mod services;
pub mod views;

#[cfg(test)]
mod tests;
