pub mod coverage;
pub mod families;
pub mod import;
pub mod locate;
pub mod shared;
pub mod status;
pub mod sweep;
