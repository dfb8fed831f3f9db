pub mod custom_resource;
pub mod envelope;
pub mod error;
pub mod key;

pub use custom_resource::{
    decode_host_key_event, CustomResourceResponse, HostKeyEvent, HostKeyProperties,
    HostKeyRequest,
};
pub use envelope::{
    decode_sns_event, S3Bucket, S3Entity, S3EventRecord, S3Notification, S3Object, SnsEvent,
    SnsMessage, SnsRecord, OBJECT_CREATED_PUT, S3_TEST_EVENT,
};
pub use error::ContractError;
pub use key::{decode_object_key, encode_object_key, CopySource, ObjectKey};
