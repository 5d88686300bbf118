pub mod clock;
pub mod cookies;
pub mod crypto;
pub mod envelope;
pub mod schemas;
pub mod validation;
