#[macro_use]
extern crate log;
pub mod io;
pub mod mcl_commands;
pub mod profile;
