pub mod siblings;

pub use siblings::FolderSiblingNavigator;
