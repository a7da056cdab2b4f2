use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum UTF-8 byte length for `author_id` in compact binary encoding.
pub const MAX_AUTHOR_ID_LEN: usize = u8::MAX as usize;
const ORIGIN_TAG_FIXED_BYTES: usize = 11; // kind (1) + author_type (1) + author_len (1) + timestamp_millis (8)

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthorType {
    Human,
    Agent,
}

impl AuthorType {
    fn to_byte(self) -> u8 {
        match self {
            Self::Human => 0,
            Self::Agent => 1,
        }
    }

    fn from_byte(value: u8) -> Result<Self, OriginTagCodecError> {
        match value {
            0 => Ok(Self::Human),
            1 => Ok(Self::Agent),
            _ => Err(OriginTagCodecError::InvalidAuthorType(value)),
        }
    }
}

impl fmt::Display for AuthorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Human => f.write_str("human"),
            Self::Agent => f.write_str("agent"),
        }
    }
}

/// What produced a document transaction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OriginKind {
    /// Typed by a local user.
    User,
    /// Applied a suggestion as insert/delete annotations.
    Suggestion,
    /// Accepted or rejected an annotation.
    Resolution,
    /// Arrived from a collaborator.
    Remote,
}

impl OriginKind {
    /// Programmatic transactions must never be mistaken for user input.
    pub const fn is_programmatic(self) -> bool {
        matches!(self, Self::Suggestion | Self::Resolution)
    }

    fn to_byte(self) -> u8 {
        match self {
            Self::User => 0,
            Self::Suggestion => 1,
            Self::Resolution => 2,
            Self::Remote => 3,
        }
    }

    fn from_byte(value: u8) -> Result<Self, OriginTagCodecError> {
        match value {
            0 => Ok(Self::User),
            1 => Ok(Self::Suggestion),
            2 => Ok(Self::Resolution),
            3 => Ok(Self::Remote),
            _ => Err(OriginTagCodecError::InvalidKind(value)),
        }
    }
}

impl fmt::Display for OriginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Suggestion => f.write_str("suggestion"),
            Self::Resolution => f.write_str("resolution"),
            Self::Remote => f.write_str("remote"),
        }
    }
}

/// Structured marker carried by every document mutation as its transaction origin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OriginTag {
    pub kind: OriginKind,
    pub author_id: String,
    pub author_type: AuthorType,
    pub timestamp: DateTime<Utc>,
}

impl OriginTag {
    pub fn new(kind: OriginKind, author_id: impl Into<String>, author_type: AuthorType) -> Self {
        Self { kind, author_id: author_id.into(), author_type, timestamp: Utc::now() }
    }

    /// Compact encoding for embedding in yrs transaction origin bytes.
    ///
    /// Layout:
    /// - byte 0: origin kind (0 = user, 1 = suggestion, 2 = resolution, 3 = remote)
    /// - byte 1: author type (0 = human, 1 = agent)
    /// - byte 2: author_id byte length (0..=255)
    /// - bytes 3..(3+len): UTF-8 author_id
    /// - final 8 bytes: timestamp (UTC millis since epoch, little-endian i64)
    pub fn to_bytes(&self) -> Result<Vec<u8>, OriginTagCodecError> {
        let author_bytes = self.author_id.as_bytes();
        if author_bytes.len() > MAX_AUTHOR_ID_LEN {
            return Err(OriginTagCodecError::AuthorIdTooLong {
                len: author_bytes.len(),
                max: MAX_AUTHOR_ID_LEN,
            });
        }

        let mut encoded = Vec::with_capacity(ORIGIN_TAG_FIXED_BYTES + author_bytes.len());
        encoded.push(self.kind.to_byte());
        encoded.push(self.author_type.to_byte());
        encoded.push(author_bytes.len() as u8);
        encoded.extend_from_slice(author_bytes);
        encoded.extend_from_slice(&self.timestamp.timestamp_millis().to_le_bytes());
        Ok(encoded)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, OriginTagCodecError> {
        if bytes.len() < ORIGIN_TAG_FIXED_BYTES {
            return Err(OriginTagCodecError::PayloadTooShort {
                expected: ORIGIN_TAG_FIXED_BYTES,
                actual: bytes.len(),
            });
        }

        let kind = OriginKind::from_byte(bytes[0])?;
        let author_type = AuthorType::from_byte(bytes[1])?;
        let author_len = bytes[2] as usize;
        let expected_len = ORIGIN_TAG_FIXED_BYTES + author_len;
        if bytes.len() != expected_len {
            return Err(OriginTagCodecError::LengthMismatch {
                expected: expected_len,
                actual: bytes.len(),
            });
        }

        let author_start = 3;
        let author_end = author_start + author_len;
        let author_id = String::from_utf8(bytes[author_start..author_end].to_vec())
            .map_err(|_| OriginTagCodecError::InvalidUtf8AuthorId)?;

        let mut millis = [0u8; 8];
        millis.copy_from_slice(&bytes[author_end..author_end + 8]);
        let timestamp_millis = i64::from_le_bytes(millis);
        let timestamp = Utc
            .timestamp_millis_opt(timestamp_millis)
            .single()
            .ok_or(OriginTagCodecError::InvalidTimestampMillis(timestamp_millis))?;

        Ok(Self { kind, author_id, author_type, timestamp })
    }

    /// Decode an origin and report whether it marks a programmatic mutation.
    ///
    /// Origins that are not redline tags (foreign bytes) count as organic.
    pub fn is_programmatic_origin(bytes: &[u8]) -> bool {
        Self::from_bytes(bytes).map(|tag| tag.kind.is_programmatic()).unwrap_or(false)
    }
}

impl fmt::Display for OriginTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}:{}@{}",
            self.kind,
            self.author_type,
            self.author_id,
            self.timestamp.to_rfc3339()
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OriginTagCodecError {
    #[error("author_id exceeds maximum length ({max} bytes), got {len}")]
    AuthorIdTooLong { len: usize, max: usize },
    #[error("origin payload too short: expected at least {expected} bytes, got {actual}")]
    PayloadTooShort { expected: usize, actual: usize },
    #[error("origin payload length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("invalid origin kind marker: {0}")]
    InvalidKind(u8),
    #[error("invalid author type marker: {0}")]
    InvalidAuthorType(u8),
    #[error("author_id is not valid UTF-8")]
    InvalidUtf8AuthorId,
    #[error("invalid timestamp millis: {0}")]
    InvalidTimestampMillis(i64),
}
