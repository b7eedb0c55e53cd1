pub mod builder;
pub mod calculations;
pub mod data;
pub mod docx;
pub mod document;
pub mod services;
pub mod text;
pub mod views;

#[cfg(test)]
pub(crate) mod tests;
