pub mod event;
pub mod manager;
pub mod mapping;
pub mod target;

#[cfg(test)]
mod mapping_test;
