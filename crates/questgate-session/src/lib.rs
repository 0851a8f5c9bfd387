pub mod config;
pub mod directory;
pub mod instance;
pub mod map_instance;
pub mod obstacle;
pub mod scheduler;
pub mod script;

#[cfg(test)]
mod testutil;
