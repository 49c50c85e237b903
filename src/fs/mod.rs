pub mod local;
pub mod provider;
pub mod sorting;
