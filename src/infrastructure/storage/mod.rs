pub mod file_store;
pub mod keyring_store;

pub use file_store::{FileCredentialStore, MemoryCredentialStore};
pub use keyring_store::KeyringCredentialStore;
