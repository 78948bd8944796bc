//! A byte cursor over encoded data.

use crate::error::ParseError;

type ReadResult<T> = core::result::Result<T, ParseError>;

/// A reader for big-endian numbers and byte strings.
///
/// Reading past the end of the underlying data always fails with
/// [`ParseError::UnexpectedEof`] and leaves the cursor where it was.
#[derive(Debug, Clone)]
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    /// The position in bytes.
    pos: usize,
}

impl<'a> Reader<'a> {
    #[inline]
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[inline]
    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// The number of bytes left to read.
    #[inline]
    pub(crate) fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// All remaining data starting at the current position.
    #[inline]
    pub(crate) fn tail(&self) -> &'a [u8] {
        self.data.get(self.pos..).unwrap_or_default()
    }

    /// Read the given number of bytes.
    pub(crate) fn read_bytes(&mut self, len: usize) -> ReadResult<&'a [u8]> {
        let bytes = self.peek_bytes(len)?;
        self.pos += len;

        Ok(bytes)
    }

    /// Return the next `len` bytes without advancing.
    pub(crate) fn peek_bytes(&self, len: usize) -> ReadResult<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(ParseError::UnexpectedEof)?;

        self.data.get(self.pos..end).ok_or(ParseError::UnexpectedEof)
    }

    #[inline]
    pub(crate) fn skip_bytes(&mut self, len: usize) -> ReadResult<()> {
        self.read_bytes(len).map(|_| ())
    }

    #[inline]
    pub(crate) fn read_byte(&mut self) -> ReadResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    #[inline]
    pub(crate) fn read_i8(&mut self) -> ReadResult<i8> {
        Ok(self.read_byte()? as i8)
    }

    pub(crate) fn read_u16(&mut self) -> ReadResult<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub(crate) fn read_u32(&mut self) -> ReadResult<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub(crate) fn read_i32(&mut self) -> ReadResult<i32> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    fn read_array<const N: usize>(&mut self) -> ReadResult<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        // `read_bytes` returned exactly `N` bytes.
        let mut array = [0; N];
        array.copy_from_slice(bytes);

        Ok(array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_are_big_endian() {
        let mut reader = Reader::new(&[0x12, 0x34, 0xFF, 0x80, 0x00, 0x00, 0x01, 0xAB]);

        assert_eq!(reader.read_u16(), Ok(0x1234));
        assert_eq!(reader.read_i8(), Ok(-1));
        assert_eq!(reader.read_i32(), Ok(i32::MIN + 1));
        assert_eq!(reader.read_byte(), Ok(0xAB));
        assert!(reader.at_end());
    }

    #[test]
    fn reading_past_end_fails() {
        let mut reader = Reader::new(&[0x01, 0x02, 0x03]);

        assert_eq!(reader.read_u32(), Err(ParseError::UnexpectedEof));
        assert_eq!(reader.read_u16(), Ok(0x0102));
        assert_eq!(reader.read_bytes(2), Err(ParseError::UnexpectedEof));
        // A failed read does not move the cursor.
        assert_eq!(reader.read_byte(), Ok(0x03));
        assert_eq!(reader.read_byte(), Err(ParseError::UnexpectedEof));
    }

    #[test]
    fn peek_skip_and_tail() {
        let mut reader = Reader::new(&[1, 2, 3, 4]);

        assert_eq!(reader.peek_bytes(2), Ok(&[1, 2][..]));
        assert_eq!(reader.remaining(), 4);
        reader.skip_bytes(3).unwrap();
        assert_eq!(reader.tail(), &[4]);
        assert_eq!(reader.remaining(), 1);
        assert!(reader.skip_bytes(2).is_err());
        assert!(reader.peek_bytes(usize::MAX).is_err());
    }
}
