pub mod sensor;
pub mod types;
