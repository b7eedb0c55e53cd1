pub mod scales;
pub mod services;
pub mod thermometers;
pub mod views;
