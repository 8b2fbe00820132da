pub mod diagnostics;
pub mod health;
pub mod refresh;
pub mod sensors;
pub mod status;
