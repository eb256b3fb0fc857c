use strum::{Display, EnumIter};
use widestring::{U16Str, U16String};

use crate::{memory::Pointer, Result};

/// Encoding of NUL terminated strings in native memory.
///
/// Choosing a charset for a given foreign function is the invocation layer's business; this
/// crate only encodes and decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Charset {
    /// UTF-8, invalid sequences decode to U+FFFD
    Utf8,
    /// 7-bit ASCII, other bytes decode to U+FFFD and other characters encode as `?`
    Ascii,
    /// UTF-16 in the runtime's byte order, terminated by a 16-bit NUL
    Utf16,
}

impl Charset {
    /// Bytes per code unit, which is also the size of the terminator.
    #[must_use]
    pub fn unit_size(self) -> usize {
        match self {
            Charset::Utf8 | Charset::Ascii => 1,
            Charset::Utf16 => 2,
        }
    }
}

impl Pointer {
    /// Reads a NUL terminated string of at most `max_length` bytes at `offset`.
    ///
    /// The search stops at the end of the memory; a string without terminator is taken up to
    /// that point.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    ///
    /// ```rust
    /// use nativemem::{memory::Charset, Runtime};
    ///
    /// let memory = Runtime::system().allocate(16);
    /// memory.put_string(0, "héllo", 16, Charset::Utf8)?;
    /// assert_eq!(memory.get_string(0, 16, Charset::Utf8)?, "héllo");
    /// assert_eq!(memory.get_string(0, 2, Charset::Ascii)?, "h\u{FFFD}");
    /// # Ok::<(), nativemem::Error>(())
    /// ```
    pub fn get_string(&self, offset: i64, max_length: i64, charset: Charset) -> Result<String> {
        self.check_bounds(offset, 0)?;
        let limit = max_length.clamp(0, self.size().saturating_sub(offset));

        match charset {
            Charset::Utf8 | Charset::Ascii => {
                let length = self.index_of(offset, 0, limit)?.unwrap_or(limit);
                let mut bytes = vec![0u8; usize::try_from(length).unwrap_or(0)];
                self.get_bytes(offset, &mut bytes)?;

                Ok(match charset {
                    Charset::Ascii => bytes
                        .iter()
                        .map(|byte| {
                            if byte.is_ascii() {
                                char::from(*byte)
                            } else {
                                char::REPLACEMENT_CHARACTER
                            }
                        })
                        .collect(),
                    _ => String::from_utf8_lossy(&bytes).into_owned(),
                })
            }
            Charset::Utf16 => {
                let mut units = Vec::new();
                for index in 0..limit / 2 {
                    match self.get_i16(offset + index * 2)? as u16 {
                        0 => break,
                        unit => units.push(unit),
                    }
                }
                Ok(U16Str::from_slice(&units).to_string_lossy())
            }
        }
    }

    /// Writes `value` and a terminator at `offset`, using at most `max_length` bytes.
    ///
    /// Longer strings are cut at a character boundary so that the terminator still fits. If
    /// `max_length` cannot even hold the terminator nothing is written.
    ///
    /// # Errors
    /// Bounds or sentinel faults, raised before anything is written.
    pub fn put_string(
        &self,
        offset: i64,
        value: &str,
        max_length: i64,
        charset: Charset,
    ) -> Result<()> {
        let unit = charset.unit_size();
        let capacity = usize::try_from(max_length).unwrap_or(0) / unit;
        if capacity == 0 {
            return Ok(());
        }

        match charset {
            Charset::Utf8 => {
                let mut end = value.len().min(capacity - 1);
                while !value.is_char_boundary(end) {
                    end -= 1;
                }
                let mut bytes = value.as_bytes()[..end].to_vec();
                bytes.push(0);
                self.put_bytes(offset, &bytes)
            }
            Charset::Ascii => {
                let mut bytes: Vec<u8> = value
                    .chars()
                    .take(capacity - 1)
                    .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
                    .collect();
                bytes.push(0);
                self.put_bytes(offset, &bytes)
            }
            Charset::Utf16 => {
                let encoded = U16String::from_str(value).into_vec();
                let mut end = encoded.len().min(capacity - 1);
                // Never split a surrogate pair
                if end > 0 && end < encoded.len() && (0xD800..0xDC00).contains(&encoded[end - 1]) {
                    end -= 1;
                }
                let mut units: Vec<i16> = encoded[..end].iter().map(|unit| *unit as i16).collect();
                units.push(0);
                self.put_i16s(offset, &units)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::test::{big_endian, lp64};

    #[test]
    fn utf8_round_trip_with_terminator() {
        let runtime = lp64();
        let memory = runtime.allocate(8);
        memory.fill(0, 8, 0xAA).unwrap();
        memory.put_string(0, "abc", 8, Charset::Utf8).unwrap();
        assert_eq!(memory.get_u8(3).unwrap(), 0);
        assert_eq!(memory.get_u8(4).unwrap(), 0xAA);
        assert_eq!(memory.get_string(0, 8, Charset::Utf8).unwrap(), "abc");
    }

    #[test]
    fn truncation_keeps_char_boundary() {
        let runtime = lp64();
        let memory = runtime.allocate(8);
        memory.put_string(0, "aé", 3, Charset::Utf8).unwrap();
        assert_eq!(memory.get_string(0, 8, Charset::Utf8).unwrap(), "a");

        memory.put_string(0, "xyz", 0, Charset::Utf8).unwrap();
        assert_eq!(memory.get_string(0, 8, Charset::Utf8).unwrap(), "a");
    }

    #[test]
    fn unterminated_read_stops_at_end() {
        let runtime = lp64();
        let memory = runtime.allocate(4);
        memory.put_bytes(0, b"wxyz").unwrap();
        assert_eq!(memory.get_string(0, 100, Charset::Ascii).unwrap(), "wxyz");
        assert_eq!(memory.get_string(2, 1, Charset::Ascii).unwrap(), "y");
    }

    #[test]
    fn ascii_replaces_non_ascii() {
        let runtime = lp64();
        let memory = runtime.allocate(8);
        memory.put_string(0, "añb", 8, Charset::Ascii).unwrap();
        assert_eq!(memory.get_string(0, 8, Charset::Ascii).unwrap(), "a?b");
    }

    #[test]
    fn utf16_follows_byte_order() {
        let runtime = big_endian();
        let memory = runtime.allocate(16);
        memory.put_string(0, "hi", 16, Charset::Utf16).unwrap();
        let mut raw = [0u8; 6];
        memory.get_bytes(0, &mut raw).unwrap();
        assert_eq!(raw, [0, b'h', 0, b'i', 0, 0]);
        assert_eq!(memory.get_string(0, 16, Charset::Utf16).unwrap(), "hi");
    }

    #[test]
    fn utf16_does_not_split_surrogates() {
        let runtime = lp64();
        let memory = runtime.allocate(16);
        memory.put_string(0, "a\u{1F600}", 6, Charset::Utf16).unwrap();
        assert_eq!(memory.get_string(0, 16, Charset::Utf16).unwrap(), "a");
    }

    #[test]
    fn null_string_faults() {
        let runtime = lp64();
        assert!(matches!(
            runtime.null().get_string(0, 8, Charset::Utf8),
            Err(Error::NullDereference { offset: 0 })
        ));
        assert!(runtime.null().put_string(0, "x", 8, Charset::Utf8).is_err());
    }
}
