//! Core types for the tierfs storage abstraction.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::FsError;

/// Upper bound on the buffer preallocated by [`File::read_to_end`].
const READ_CAPACITY_HINT: usize = 64 * 1024;

/// Boxed read stream returned by [`FsRead::open`](crate::FsRead::open).
pub type Reader = Box<dyn AsyncRead + Send + Unpin>;

/// Attributes stored alongside file content.
///
/// Metadata key order is irrelevant; two attribute sets with the same keys
/// and values compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attributes {
    /// MIME type of the content. Empty when unknown.
    pub content_type: String,
    /// Size in bytes.
    pub size: u64,
    /// Arbitrary string-keyed metadata.
    pub metadata: HashMap<String, String>,
    /// Last modification time.
    #[cfg_attr(feature = "serde", serde(with = "system_time_serde"))]
    pub mod_time: SystemTime,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            content_type: String::new(),
            size: 0,
            metadata: HashMap::new(),
            mod_time: SystemTime::UNIX_EPOCH,
        }
    }
}

/// An open, readable file.
///
/// The caller owns the stream. Dropping the `File` releases it.
pub struct File {
    /// Content stream.
    pub reader: Reader,
    /// Attributes recorded for the content.
    pub attributes: Attributes,
    /// When the tier that served this read stored its copy.
    pub creation_time: SystemTime,
}

impl File {
    /// Build a file over an in-memory buffer.
    pub fn from_bytes(data: Bytes, attributes: Attributes, creation_time: SystemTime) -> Self {
        Self {
            reader: Box::new(std::io::Cursor::new(data)),
            attributes,
            creation_time,
        }
    }

    /// Drain the stream into memory.
    pub async fn read_to_end(mut self) -> Result<Bytes, FsError> {
        // The reported size is only a hint; it may be wrong or huge.
        let hint = usize::try_from(self.attributes.size)
            .unwrap_or(usize::MAX)
            .min(READ_CAPACITY_HINT);
        let mut buf = Vec::with_capacity(hint);
        self.reader
            .read_to_end(&mut buf)
            .await
            .map_err(|e| FsError::io("read", String::new(), e))?;
        Ok(Bytes::from(buf))
    }

    /// Age of the served copy relative to `now`.
    ///
    /// A creation time in the future (clock skew) counts as age zero.
    pub fn age(&self, now: SystemTime) -> Duration {
        now.duration_since(self.creation_time)
            .unwrap_or(Duration::ZERO)
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("attributes", &self.attributes)
            .field("creation_time", &self.creation_time)
            .finish_non_exhaustive()
    }
}

/// Options for read-class operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub struct ReaderOptions {}

/// An access-control entry applied to written content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AclRule {
    /// Who the rule applies to, e.g. `allAuthenticatedUsers`.
    pub entity: String,
    /// Granted role, e.g. `READER`.
    pub role: String,
}

/// Options for [`FsWrite::create`](crate::FsWrite::create).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WriterOptions {
    /// Attributes to store alongside the content.
    ///
    /// `size` and `mod_time` are filled in by the backend on commit.
    pub attributes: Attributes,
    /// Write chunking hint in bytes. Zero lets the backend decide.
    pub buffer_size: usize,
    /// Access-control entries. `None` keeps the backend default.
    pub acl: Option<Vec<AclRule>>,
}

impl WriterOptions {
    /// Set the content type.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.attributes.content_type = content_type.into();
        self
    }

    /// Add a metadata entry.
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.metadata.insert(key.into(), value.into());
        self
    }

    /// Set the chunking hint.
    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Set the access-control entries.
    pub fn acl(mut self, acl: Vec<AclRule>) -> Self {
        self.acl = Some(acl);
        self
    }
}

/// Options for [`FsRead::url`](crate::FsRead::url).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignedUrlOptions {
    /// HTTP method the URL is valid for.
    pub method: String,
    /// Expiry of the URL. `None` lets the backend pick its default.
    pub expires: Option<Duration>,
    /// Identity used to sign, when the backend needs one.
    pub access_id: Option<String>,
}

impl Default for SignedUrlOptions {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            expires: None,
            access_id: None,
        }
    }
}

/// Serde support for SystemTime (when serde feature is enabled).
#[cfg(feature = "serde")]
mod system_time_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let duration = time.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
        (duration.as_secs(), duration.subsec_nanos()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (secs, nanos): (u64, u32) = Deserialize::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + Duration::new(secs, nanos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_to_end_ignores_bogus_size() {
        let attributes = Attributes {
            size: u64::MAX,
            ..Attributes::default()
        };
        let file = File::from_bytes(Bytes::from_static(b"bar"), attributes, SystemTime::now());
        assert_eq!(&file.read_to_end().await.unwrap()[..], b"bar");
    }

    #[test]
    fn attributes_metadata_order_is_irrelevant() {
        let a = WriterOptions::default()
            .metadata("a", "1")
            .metadata("b", "2")
            .attributes;
        let b = WriterOptions::default()
            .metadata("b", "2")
            .metadata("a", "1")
            .attributes;
        assert_eq!(a, b);
    }

    #[test]
    fn writer_options_builder() {
        let opts = WriterOptions::default()
            .content_type("text/plain")
            .buffer_size(4096)
            .acl(vec![AclRule {
                entity: "allUsers".into(),
                role: "READER".into(),
            }]);
        assert_eq!(opts.attributes.content_type, "text/plain");
        assert_eq!(opts.buffer_size, 4096);
        assert_eq!(opts.acl.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn signed_url_defaults_to_get() {
        assert_eq!(SignedUrlOptions::default().method, "GET");
    }

    #[test]
    fn file_age_saturates_on_future_creation() {
        let now = SystemTime::now();
        let file = File::from_bytes(
            Bytes::new(),
            Attributes::default(),
            now + Duration::from_secs(60),
        );
        assert_eq!(file.age(now), Duration::ZERO);
    }

    #[tokio::test]
    async fn file_read_to_end() {
        let file = File::from_bytes(
            Bytes::from_static(b"bar"),
            Attributes::default(),
            SystemTime::now(),
        );
        assert_eq!(file.read_to_end().await.unwrap(), Bytes::from_static(b"bar"));
    }

    #[test]
    fn types_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        fn assert_send<T: Send>() {}
        assert_send_sync::<Attributes>();
        assert_send_sync::<WriterOptions>();
        assert_send_sync::<ReaderOptions>();
        assert_send_sync::<SignedUrlOptions>();
        assert_send::<File>();
    }
}
