pub mod key_material;
pub mod rotator;

pub use key_material::decode_host_key;
pub use rotator::{HostKeyRotator, RotatorError};
