use crate::core_api::CoreError;

/// Bounds-checked cursor over a byte buffer. Every read that would run past
/// the end reports a parse error at the offset where it started.
pub struct LittleEndianReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> LittleEndianReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn read_u32(&mut self) -> Result<u32, CoreError> {
        Ok(u32::from_le_bytes(self.read_array::<4>()?))
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CoreError> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], CoreError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| {
                CoreError::parse(
                    self.pos,
                    format!("truncated buffer: wanted {n} bytes, {} left", self.remaining()),
                )
            })?;
        let bytes = self.bytes;
        let out = &bytes[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    /// Reads a null-terminated string and consumes the terminator.
    pub fn read_null_terminated_string(&mut self) -> Result<String, CoreError> {
        let start = self.pos;
        let bytes = self.bytes;
        let rest = &bytes[self.pos..];
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| CoreError::parse(start, "unterminated string"))?;
        self.pos += len + 1;
        Ok(String::from_utf8_lossy(&rest[..len]).into_owned())
    }

    /// Moves to the first occurrence of `needle` at or after the cursor,
    /// comparing ASCII case-insensitively. The cursor is left untouched when
    /// there is no match.
    pub fn find(&mut self, needle: &[u8]) -> Option<usize> {
        let bytes = self.bytes;
        let found = find_ignore_ascii_case(&bytes[self.pos..], needle)? + self.pos;
        self.pos = found;
        Some(found)
    }

    pub fn seek_to(&mut self, pos: usize) -> Result<(), CoreError> {
        if pos > self.bytes.len() {
            return Err(CoreError::parse(
                pos,
                format!("seek past end of {}-byte buffer", self.bytes.len()),
            ));
        }
        self.pos = pos;
        Ok(())
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }
}

pub(crate) fn find_ignore_ascii_case(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}
