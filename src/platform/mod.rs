pub mod secure_storage;
pub mod paths;

pub use secure_storage::{SecureStorage, SecureStorageManager, KeyringStorage};
pub use paths::AppPaths;
