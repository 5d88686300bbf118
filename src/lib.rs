pub mod errors;
pub mod routes;
pub mod services;
pub mod setup;
pub mod utils;
