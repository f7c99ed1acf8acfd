//! Byte-order resolution for keyword streams.
//!
//! The on-disk byte order of a stream is fixed when the stream is opened.
//! Comparing it with the host order (supplied by a [`ByteOrderProvider`])
//! yields a single flip flag that every multi-byte element goes through.

use crate::core::types::TypeTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ByteOrder {
    #[default]
    Big,
    Little,
}

impl ByteOrder {
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }
}

/// Reports the byte order of the machine doing the decoding.
pub trait ByteOrderProvider: Send + Sync {
    fn host_order(&self) -> ByteOrder;
}

/// Provider backed by the compile-time target endianness.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeByteOrder;

impl ByteOrderProvider for NativeByteOrder {
    fn host_order(&self) -> ByteOrder {
        ByteOrder::native()
    }
}

impl ByteOrderProvider for ByteOrder {
    fn host_order(&self) -> ByteOrder {
        *self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Endian {
    flip: bool,
}

impl Endian {
    /// No swapping: file bytes are already in host order.
    pub const NATIVE: Endian = Endian { flip: false };

    pub fn resolve(file_order: ByteOrder, host: &dyn ByteOrderProvider) -> Self {
        Self {
            flip: file_order != host.host_order(),
        }
    }

    pub const fn with_flip(flip: bool) -> Self {
        Self { flip }
    }

    #[inline]
    pub fn flip(&self) -> bool {
        self.flip
    }

    #[inline]
    pub fn read_i32(&self, bytes: [u8; 4]) -> i32 {
        let value = i32::from_ne_bytes(bytes);
        if self.flip {
            value.swap_bytes()
        } else {
            value
        }
    }

    #[inline]
    pub fn write_i32(&self, value: i32) -> [u8; 4] {
        let value = if self.flip { value.swap_bytes() } else { value };
        value.to_ne_bytes()
    }

    #[inline]
    pub fn read_f32(&self, bytes: [u8; 4]) -> f32 {
        let bits = u32::from_ne_bytes(bytes);
        f32::from_bits(if self.flip { bits.swap_bytes() } else { bits })
    }

    #[inline]
    pub fn write_f32(&self, value: f32) -> [u8; 4] {
        let bits = value.to_bits();
        let bits = if self.flip { bits.swap_bytes() } else { bits };
        bits.to_ne_bytes()
    }

    #[inline]
    pub fn read_f64(&self, bytes: [u8; 8]) -> f64 {
        let bits = u64::from_ne_bytes(bytes);
        f64::from_bits(if self.flip { bits.swap_bytes() } else { bits })
    }

    #[inline]
    pub fn write_f64(&self, value: f64) -> [u8; 8] {
        let bits = value.to_bits();
        let bits = if self.flip { bits.swap_bytes() } else { bits };
        bits.to_ne_bytes()
    }

    /// Swap every element of `bytes` in place when the flag is set.
    ///
    /// Character payloads are byte strings and are never touched.
    pub fn apply(&self, tag: TypeTag, bytes: &mut [u8]) {
        if !self.flip {
            return;
        }
        match tag {
            TypeTag::Int32 | TypeTag::Float32 | TypeTag::Bool => {
                bytes.chunks_exact_mut(4).for_each(|chunk| chunk.reverse());
            }
            TypeTag::Float64 => {
                bytes.chunks_exact_mut(8).for_each(|chunk| chunk.reverse());
            }
            TypeTag::Char8 | TypeTag::Message => {}
        }
    }
}
