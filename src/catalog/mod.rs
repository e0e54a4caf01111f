pub mod builder;
pub mod cache;
pub mod keys;
pub mod model;
pub mod snapshot;
