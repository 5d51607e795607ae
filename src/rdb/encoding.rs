use crate::rdb::RdbError;

/// Cursor over the raw snapshot bytes.
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    cursor: usize,
}

/// What a length byte announces: either a plain length or one of the
/// special string encodings.
enum LengthEncoding {
    Length(usize),
    Int8,
    Int16,
    Int32,
    Lzf,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, cursor: 0 }
    }

    pub fn skip(&mut self, count: usize) -> Result<(), RdbError> {
        self.take(count).map(|_| ())
    }

    pub fn read_byte(&mut self) -> Result<u8, RdbError> {
        let byte = *self.data.get(self.cursor).ok_or(RdbError::UnexpectedEof)?;
        self.cursor += 1;
        Ok(byte)
    }

    pub fn take(&mut self, count: usize) -> Result<&'a [u8], RdbError> {
        let end = self
            .cursor
            .checked_add(count)
            .filter(|&end| end <= self.data.len())
            .ok_or(RdbError::UnexpectedEof)?;

        let slice = &self.data[self.cursor..end];
        self.cursor = end;
        Ok(slice)
    }

    pub fn read_u32_le(&mut self) -> Result<u32, RdbError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_u64_le(&mut self) -> Result<u64, RdbError> {
        let bytes = self.take(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
    }

    /// A "length-encoded" integer, used for database numbers and resize
    /// hints. Special encodings are not valid here.
    pub fn read_length(&mut self) -> Result<usize, RdbError> {
        match self.read_length_encoding()? {
            LengthEncoding::Length(length) => Ok(length),
            _ => Err(RdbError::InvalidData(
                "expected a plain length".to_string(),
            )),
        }
    }

    /// A "string-encoded" value: a length-prefixed string or an 8/16/32-bit
    /// integer rendered back to decimal. LZF-compressed strings are
    /// rejected.
    pub fn read_string(&mut self) -> Result<String, RdbError> {
        match self.read_length_encoding()? {
            LengthEncoding::Length(length) => {
                let bytes = self.take(length)?;
                String::from_utf8(bytes.to_vec())
                    .map_err(|_| RdbError::InvalidData("string is not UTF-8".to_string()))
            }
            LengthEncoding::Int8 => Ok((self.read_byte()? as i8).to_string()),
            LengthEncoding::Int16 => {
                let bytes = self.take(2)?;
                Ok(i16::from_le_bytes(bytes.try_into().unwrap()).to_string())
            }
            LengthEncoding::Int32 => {
                let bytes = self.take(4)?;
                Ok(i32::from_le_bytes(bytes.try_into().unwrap()).to_string())
            }
            LengthEncoding::Lzf => Err(RdbError::UnsupportedType),
        }
    }

    fn read_length_encoding(&mut self) -> Result<LengthEncoding, RdbError> {
        let first = self.read_byte()?;

        match first >> 6 {
            // 6-bit length in this byte.
            0b00 => Ok(LengthEncoding::Length((first & 0x3F) as usize)),
            // 14-bit length: low 6 bits here plus the next byte, big-endian.
            0b01 => {
                let second = self.read_byte()?;
                Ok(LengthEncoding::Length(
                    (((first & 0x3F) as usize) << 8) | second as usize,
                ))
            }
            // 32-bit big-endian length in the next four bytes.
            0b10 => {
                let length = self.take(4)?;
                Ok(LengthEncoding::Length(
                    u32::from_be_bytes(length.try_into().unwrap()) as usize,
                ))
            }
            // Special string encodings.
            _ => match first & 0x3F {
                0 => Ok(LengthEncoding::Int8),
                1 => Ok(LengthEncoding::Int16),
                2 => Ok(LengthEncoding::Int32),
                3 => Ok(LengthEncoding::Lzf),
                other => Err(RdbError::InvalidData(format!(
                    "unknown string encoding {}",
                    other
                ))),
            },
        }
    }
}
