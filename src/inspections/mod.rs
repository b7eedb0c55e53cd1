pub mod diameter;
pub mod loading;
pub mod marking;
pub mod models;
pub mod pallets;
pub mod quality;
pub mod quantity;
pub mod sections;
pub mod services;
pub mod storage;
pub mod submission;
pub mod views;
