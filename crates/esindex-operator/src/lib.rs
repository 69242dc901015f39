pub mod config;
pub mod crds;
pub mod credentials;
pub mod error;
pub mod es;
pub mod index_controller;
pub mod owner;
pub mod store;

#[cfg(test)]
mod test_support;
