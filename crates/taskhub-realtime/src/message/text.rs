//! Reference-counted UTF-8 text.

use std::fmt;
use std::ops::Deref;
use std::str::Utf8Error;

use bytes::Bytes;

/// UTF-8 text backed by [`Bytes`].
///
/// Clones share one buffer. A text payload fanned out to many sessions
/// reaches every transport without being copied.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct SharedText(Bytes);

impl SharedText {
    /// Wrap a static string without allocating.
    pub const fn from_static(text: &'static str) -> Self {
        Self(Bytes::from_static(text.as_bytes()))
    }

    /// The text as a string slice.
    pub fn as_str(&self) -> &str {
        // Every constructor checks or guarantees UTF-8.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    /// The underlying buffer, shared with every clone.
    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    /// Whether two values share the same buffer.
    pub fn shares_buffer_with(&self, other: &Self) -> bool {
        self.0.as_ptr() == other.0.as_ptr() && self.0.len() == other.0.len()
    }
}

impl Deref for SharedText {
    type Target = str;

    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<Bytes> for SharedText {
    type Error = Utf8Error;

    fn try_from(bytes: Bytes) -> Result<Self, Self::Error> {
        std::str::from_utf8(&bytes)?;
        Ok(Self(bytes))
    }
}

impl From<String> for SharedText {
    fn from(text: String) -> Self {
        Self(Bytes::from(text))
    }
}

impl From<&str> for SharedText {
    fn from(text: &str) -> Self {
        Self(Bytes::copy_from_slice(text.as_bytes()))
    }
}

impl From<SharedText> for Bytes {
    fn from(text: SharedText) -> Self {
        text.0
    }
}

impl PartialEq<str> for SharedText {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for SharedText {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Debug for SharedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for SharedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_shares_buffer() {
        let text = SharedText::from(String::from("hello"));
        let copy = text.clone();
        assert!(copy.shares_buffer_with(&text));
        assert_eq!(copy, "hello");
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        assert!(SharedText::try_from(Bytes::from_static(&[0xff, 0xfe])).is_err());
        let text = SharedText::try_from(Bytes::from_static(b"ok")).unwrap();
        assert_eq!(text.as_str(), "ok");
    }
}
