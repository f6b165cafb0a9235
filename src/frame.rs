use crate::protocol::Endianness;

mod sealed {
    pub trait Sealed {}

    impl Sealed for u8 {}
    impl Sealed for u16 {}
    impl Sealed for u32 {}
    impl Sealed for u64 {}
    impl Sealed for i16 {}
    impl Sealed for i32 {}
    impl Sealed for i64 {}
    impl Sealed for f64 {}
}

/// A fixed-width value which can be stored in and loaded from a buffer.
///
/// The size of a frame is also its alignment, which holds for every basic
/// D-Bus type.
pub trait Frame: Copy + self::sealed::Sealed {
    /// The width and alignment of the frame in bytes.
    const SIZE: usize;

    #[doc(hidden)]
    fn store_to(self, out: &mut Vec<u8>, endianness: Endianness);

    #[doc(hidden)]
    fn load_from(bytes: &[u8], endianness: Endianness) -> Self;
}

macro_rules! impl_number {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Frame for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn store_to(self, out: &mut Vec<u8>, endianness: Endianness) {
                    if endianness == Endianness::BIG {
                        out.extend_from_slice(&self.to_be_bytes());
                    } else {
                        out.extend_from_slice(&self.to_le_bytes());
                    }
                }

                #[inline]
                fn load_from(bytes: &[u8], endianness: Endianness) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);

                    if endianness == Endianness::BIG {
                        <$ty>::from_be_bytes(raw)
                    } else {
                        <$ty>::from_le_bytes(raw)
                    }
                }
            }
        )*
    }
}

impl_number!(u8, u16, u32, u64);
impl_number!(i16, i32, i64);
impl_number!(f64);
