pub mod bounds;
pub mod geo;
pub mod layers;
pub mod models;
