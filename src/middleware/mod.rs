pub mod logger;
pub mod recover;
