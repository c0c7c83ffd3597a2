use bytes::{Buf, BufMut, Bytes};

use crate::prism::ProtocolError;

/// Length is `usize` in rust, while prism length prefix is `u32`.
pub trait UsizeExt {
    /// Panic when overflow instead of wrapping.
    ///
    /// User supplied lengths are rejected earlier by `codec::check_len`.
    fn to_u32(self) -> u32;
}

/// Length prefixed and optional field operation in [`BufMut`].
pub trait BufMutExt: BufMut {
    /// Write `u32` length prefix followed by raw bytes.
    fn put_blob(&mut self, blob: &[u8]);

    /// Write `u32` length prefix followed by utf8 bytes.
    fn put_string(&mut self, string: &str) {
        self.put_blob(string.as_bytes());
    }

    /// Write a boolean as single byte.
    fn put_flag(&mut self, flag: bool) {
        self.put_u8(flag as u8);
    }

    /// Write presence byte, followed by the value if any.
    fn put_option<T>(&mut self, value: Option<T>, put: impl FnOnce(&mut Self, T)) {
        match value {
            Some(value) => {
                self.put_u8(1);
                put(self, value);
            }
            None => self.put_u8(0),
        }
    }
}

/// Checked read operation in [`Bytes`].
///
/// Unlike [`Buf`] getters, these never panic on short input.
pub trait BytesExt {
    fn read_u8(&mut self) -> Result<u8, ProtocolError>;
    fn read_u32(&mut self) -> Result<u32, ProtocolError>;
    fn read_i32(&mut self) -> Result<i32, ProtocolError>;
    fn read_u64(&mut self) -> Result<u64, ProtocolError>;
    fn read_i64(&mut self) -> Result<i64, ProtocolError>;
    fn read_f32(&mut self) -> Result<f32, ProtocolError>;
    fn read_f64(&mut self) -> Result<f64, ProtocolError>;

    /// Read a single byte boolean, any non zero byte is `true`.
    fn read_flag(&mut self) -> Result<bool, ProtocolError>;

    /// Read `u32` length prefixed bytes without copying.
    fn read_blob(&mut self) -> Result<Bytes, ProtocolError>;

    /// Read `u32` length prefixed utf8 string.
    fn read_string(&mut self) -> Result<String, ProtocolError>;

    /// Read presence byte, followed by the value if present.
    fn read_option<T>(
        &mut self,
        read: impl FnOnce(&mut Self) -> Result<T, ProtocolError>,
    ) -> Result<Option<T>, ProtocolError>;
}

impl UsizeExt for usize {
    fn to_u32(self) -> u32 {
        self.try_into().expect("message size too large for protocol")
    }
}

impl<B: BufMut> BufMutExt for B {
    fn put_blob(&mut self, blob: &[u8]) {
        self.put_u32(blob.len().to_u32());
        self.put_slice(blob);
    }
}

impl BytesExt for Bytes {
    fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.try_get_u8()?)
    }

    fn read_u32(&mut self) -> Result<u32, ProtocolError> {
        Ok(self.try_get_u32()?)
    }

    fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        Ok(self.try_get_i32()?)
    }

    fn read_u64(&mut self) -> Result<u64, ProtocolError> {
        Ok(self.try_get_u64()?)
    }

    fn read_i64(&mut self) -> Result<i64, ProtocolError> {
        Ok(self.try_get_i64()?)
    }

    fn read_f32(&mut self) -> Result<f32, ProtocolError> {
        Ok(self.try_get_f32()?)
    }

    fn read_f64(&mut self) -> Result<f64, ProtocolError> {
        Ok(self.try_get_f64()?)
    }

    fn read_flag(&mut self) -> Result<bool, ProtocolError> {
        Ok(self.read_u8()? != 0)
    }

    fn read_blob(&mut self) -> Result<Bytes, ProtocolError> {
        let len = self.read_u32()? as usize;
        if self.remaining() < len {
            return Err(ProtocolError::Truncated {
                requested: len,
                available: self.remaining(),
            });
        }
        Ok(self.split_to(len))
    }

    fn read_string(&mut self) -> Result<String, ProtocolError> {
        let blob = self.read_blob()?;
        String::from_utf8(blob.into()).map_err(|e| ProtocolError::Utf8(e.utf8_error()))
    }

    fn read_option<T>(
        &mut self,
        read: impl FnOnce(&mut Self) -> Result<T, ProtocolError>,
    ) -> Result<Option<T>, ProtocolError> {
        match self.read_u8()? {
            0 => Ok(None),
            _ => read(self).map(Some),
        }
    }
}
