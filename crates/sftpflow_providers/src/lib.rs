pub mod aws;
pub mod error;
pub mod memory;
pub mod traits;

pub use aws::{load_sdk_config, S3ObjectStore, SecretsManagerStore, TransferEndpointManager};
pub use error::ProviderError;
pub use memory::{InMemoryEndpointManager, InMemoryObjectStore, InMemorySecretStore};
pub use traits::{EndpointManager, ObjectStore, SecretStore};
