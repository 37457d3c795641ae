//! Key value metadata attached to a field.
//!
//! The C data interface carries metadata as a single binary blob: an `i32`
//! pair count followed by each key and value as an `i32` byte length and the
//! utf-8 bytes, all integers in native byte order.

use std::os::raw::c_char;

use quiver_error::{QuiverError, Result};

/// Ordered key value pairs.
///
/// Keys are not required to be unique. Lookups return the first match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pairs: Vec<(String, String)>,
}

impl Metadata {
    pub const fn new() -> Self {
        Metadata { pairs: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Encode into the C data interface binary format.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.extend_from_slice(&encoded_len(self.pairs.len())?.to_ne_bytes());
        for (key, value) in &self.pairs {
            for s in [key, value] {
                out.extend_from_slice(&encoded_len(s.len())?.to_ne_bytes());
                out.extend_from_slice(s.as_bytes());
            }
        }
        Ok(out)
    }

    /// Decode from the C data interface binary format.
    ///
    /// Trailing bytes after the last pair are ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader { bytes, pos: 0 };
        let count = reader.read_len()?;
        let mut pairs = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            let key = reader.read_str()?;
            let value = reader.read_str()?;
            pairs.push((key, value));
        }
        Ok(Metadata { pairs })
    }

    /// Decode metadata from a pointer as found in an exported schema.
    ///
    /// # Safety
    ///
    /// `ptr` must point at a well formed metadata blob.
    pub(crate) unsafe fn decode_ptr(ptr: *const c_char) -> Result<Self> {
        let ptr = ptr as *const u8;
        let read_i32 = |pos: usize| {
            let mut buf = [0; 4];
            std::ptr::copy_nonoverlapping(ptr.add(pos), buf.as_mut_ptr(), 4);
            i32::from_ne_bytes(buf)
        };

        // Walk the lengths to find the size of the blob.
        let count = usize::try_from(read_i32(0))
            .map_err(|_| QuiverError::new("Negative metadata pair count"))?;
        let mut pos = 4;
        for _ in 0..count * 2 {
            let len = usize::try_from(read_i32(pos))
                .map_err(|_| QuiverError::new("Negative metadata length"))?;
            pos += 4 + len;
        }

        Self::decode(std::slice::from_raw_parts(ptr, pos))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Metadata {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Metadata {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn encoded_len(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| QuiverError::new("Metadata too large").with_field("len", len))
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let out = self
            .bytes
            .get(self.pos..self.pos + n)
            .ok_or_else(|| {
                QuiverError::new("Metadata truncated")
                    .with_field("pos", self.pos)
                    .with_field("needed", n)
            })?;
        self.pos += n;
        Ok(out)
    }

    fn read_len(&mut self) -> Result<usize> {
        let mut buf = [0; 4];
        buf.copy_from_slice(self.take(4)?);
        usize::try_from(i32::from_ne_bytes(buf))
            .map_err(|_| QuiverError::new("Negative metadata length"))
    }

    fn read_str(&mut self) -> Result<String> {
        let len = self.read_len()?;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| QuiverError::with_source("Metadata is not valid utf-8", Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_layout() {
        let metadata: Metadata = [("k", "vv")].into_iter().collect();
        let bytes = metadata.encode().unwrap();

        let mut expected = Vec::new();
        expected.extend_from_slice(&1_i32.to_ne_bytes());
        expected.extend_from_slice(&1_i32.to_ne_bytes());
        expected.extend_from_slice(b"k");
        expected.extend_from_slice(&2_i32.to_ne_bytes());
        expected.extend_from_slice(b"vv");
        assert_eq!(expected, bytes);
    }

    #[test]
    fn decode_encoded() {
        let mut metadata = Metadata::new();
        metadata.insert("origin", "sensor");
        metadata.insert("", "empty key");
        metadata.insert("origin", "shadowed");

        let got = Metadata::decode(&metadata.encode().unwrap()).unwrap();
        assert_eq!(metadata, got);
        assert_eq!(Some("sensor"), got.get("origin"));
        assert_eq!(Some("empty key"), got.get(""));
        assert_eq!(None, got.get("missing"));
        assert_eq!(3, got.iter().count());
    }

    #[test]
    fn decode_from_pointer() {
        let metadata: Metadata = [("a", "1"), ("bc", "")].into_iter().collect();
        let bytes = metadata.encode().unwrap();
        let got = unsafe { Metadata::decode_ptr(bytes.as_ptr() as *const c_char) }.unwrap();
        assert_eq!(metadata, got);
    }

    #[test]
    fn malformed() {
        Metadata::decode(&[1, 0]).unwrap_err();

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1_i32.to_ne_bytes());
        bytes.extend_from_slice(&5_i32.to_ne_bytes());
        bytes.extend_from_slice(b"ab");
        Metadata::decode(&bytes).unwrap_err();

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1_i32.to_ne_bytes());
        bytes.extend_from_slice(&1_i32.to_ne_bytes());
        bytes.push(0xFF);
        bytes.extend_from_slice(&0_i32.to_ne_bytes());
        Metadata::decode(&bytes).unwrap_err();

        Metadata::decode(&(-1_i32).to_ne_bytes()).unwrap_err();
    }
}
