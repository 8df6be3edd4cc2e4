pub mod config_service;
pub mod dto;
pub mod json_blob_store;
pub mod paths;
pub mod secret_service;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::json_blob_store::JsonBlobStore;
pub use crate::paths::StudiaPaths;
pub use crate::secret_service::SecretService;
