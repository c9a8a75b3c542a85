pub mod aggregate;
pub mod alignment;
pub mod calibrate;
pub mod families;
pub mod sweep;
pub mod system;
pub mod witness;
