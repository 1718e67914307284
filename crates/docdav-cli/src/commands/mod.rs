pub mod list;
pub mod register;
pub mod serve;
