use std::borrow::Cow;
use std::fmt;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::ContractError;

/// Characters S3 leaves untouched when it writes a key into an event notification.
const KEY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// An object key as delivered in a storage notification, paired with the
/// plain key it names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    encoded: String,
    decoded: String,
}

impl ObjectKey {
    pub fn from_encoded(encoded: impl Into<String>) -> Result<Self, ContractError> {
        let encoded = encoded.into();
        let decoded = decode_object_key(&encoded)?;
        Ok(Self { encoded, decoded })
    }

    pub fn from_decoded(decoded: impl Into<String>) -> Self {
        let decoded = decoded.into();
        Self {
            encoded: encode_object_key(&decoded),
            decoded,
        }
    }

    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    pub fn decoded(&self) -> &str {
        &self.decoded
    }

    pub fn copy_source(&self, bucket: &str) -> CopySource {
        CopySource {
            bucket: bucket.to_string(),
            encoded_key: self.encoded.clone(),
        }
    }
}

/// The `bucket/key` reference a server-side copy reads from. The key stays
/// URL-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopySource {
    pub bucket: String,
    pub encoded_key: String,
}

impl CopySource {
    pub fn decoded_key(&self) -> Result<String, ContractError> {
        decode_object_key(&self.encoded_key)
    }
}

impl fmt::Display for CopySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.encoded_key)
    }
}

/// Decode a notification key: `+` becomes a space first, then percent escapes
/// are resolved. The order matters, a literal plus arrives as `%2B`.
pub fn decode_object_key(encoded: &str) -> Result<String, ContractError> {
    let spaced = encoded.replace('+', " ");
    if has_malformed_escape(&spaced) {
        return Err(ContractError::MalformedKey {
            key: encoded.to_string(),
            reason: "percent sign not followed by two hex digits",
        });
    }

    percent_decode_str(&spaced)
        .decode_utf8()
        .map(Cow::into_owned)
        .map_err(|_| ContractError::MalformedKey {
            key: encoded.to_string(),
            reason: "decoded key is not valid UTF-8",
        })
}

/// Encode a plain key the way S3 notifications carry it.
pub fn encode_object_key(decoded: &str) -> String {
    utf8_percent_encode(decoded, KEY_ENCODE_SET)
        .map(|chunk| if chunk == "%20" { "+" } else { chunk })
        .collect()
}

fn has_malformed_escape(input: &str) -> bool {
    let bytes = input.as_bytes();
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] != b'%' {
            idx += 1;
            continue;
        }
        match bytes.get(idx + 1..idx + 3) {
            Some([hi, lo]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => idx += 3,
            _ => return true,
        }
    }
    false
}
