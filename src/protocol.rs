//! Low level details for the D-Bus protocol implementation.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor};

macro_rules! raw_enum {
    (
        $(#[doc = $doc:literal])*
        #[repr($repr:ty)]
        $vis:vis enum $name:ident {
            $(
                $(#[$($variant_meta:meta)*])*
                $variant:ident = $value:expr
            ),* $(,)?
        }
    ) => {
        $(#[doc = $doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(transparent)]
        $vis struct $name(pub(crate) $repr);

        impl $name {
            $(
                $(#[$($variant_meta)*])*
                $vis const $variant: Self = Self($value);
            )*
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match *self {
                    $(Self::$variant => f.write_str(stringify!($variant)),)*
                    _ => f.write_str("INVALID"),
                }
            }
        }
    }
}

macro_rules! raw_set {
    (
        $(#[doc = $doc:literal])*
        #[repr($repr:ty)]
        $vis:vis enum $name:ident {
            $(
                $(#[$($variant_meta:meta)*])*
                $variant:ident = $value:expr
            ),* $(,)?
        }
    ) => {
        $(#[doc = $doc])*
        #[derive(Default, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(transparent)]
        $vis struct $name(pub(crate) $repr);

        impl $name {
            $(
                $(#[$($variant_meta)*])*
                $vis const $variant: Self = Self($value);
            )*
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                struct Raw(&'static str);

                impl fmt::Debug for Raw {
                    #[inline]
                    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                        write!(f, "{}", self.0)
                    }
                }

                struct Bits($repr);

                impl fmt::Debug for Bits {
                    #[inline]
                    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                        write!(f, "{:b}", self.0)
                    }
                }

                let mut f = f.debug_set();

                let mut this = *self;

                $(
                    if this.0 & Self::$variant.0 != 0 {
                        f.entry(&Raw(stringify!($variant)));
                        this = Self(this.0 ^ Self::$variant.0);
                    }
                )*

                if this.0 != 0 {
                    f.entry(&Bits(this.0));
                }

                f.finish()
            }
        }
    }
}

raw_enum! {
    /// The endianness of a message.
    #[repr(u8)]
    pub enum Endianness {
        /// Little endian.
        LITTLE = b'l',
        /// Big endian.
        BIG = b'B',
    }
}

impl Endianness {
    /// Native endian.
    #[cfg(target_endian = "little")]
    pub const NATIVE: Self = Self::LITTLE;
    /// Native endian.
    #[cfg(target_endian = "big")]
    pub const NATIVE: Self = Self::BIG;
}

raw_enum! {
    /// The type of a message.
    #[repr(u8)]
    pub enum MessageType {
        /// A call which may be answered with a return or an error.
        METHOD_CALL = 1,
        /// A successful reply.
        METHOD_RETURN = 2,
        /// A failed reply, a leading string argument describes the failure.
        ERROR = 3,
        /// A broadcast which is never replied to.
        SIGNAL = 4,
    }
}

raw_set! {
    /// Flags inside of a D-Bus message.
    ///
    /// # Examples
    ///
    /// ```
    /// use dynbus::protocol::Flags;
    /// let flags = Flags::EMPTY;
    /// assert!(!(flags & Flags::NO_REPLY_EXPECTED));
    ///
    /// let flags = Flags::EMPTY | Flags::NO_REPLY_EXPECTED;
    /// assert!(flags & Flags::NO_REPLY_EXPECTED);
    /// assert!(!(flags & Flags::NO_AUTO_START));
    /// ```
    #[repr(u8)]
    pub enum Flags {
        /// An empty set of flags.
        EMPTY = 0,
        /// The sender doesn't want a reply.
        NO_REPLY_EXPECTED = 1,
        /// The bus should not activate a service to receive the message.
        NO_AUTO_START = 2,
        /// The sender accepts waiting on interactive authorization.
        ALLOW_INTERACTIVE_AUTHORIZATION = 4,
    }
}

impl BitOr<Flags> for Flags {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Flags) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitAnd<Flags> for Flags {
    type Output = bool;

    #[inline]
    fn bitand(self, rhs: Flags) -> Self::Output {
        self.0 & rhs.0 != 0
    }
}

impl BitXor<Flags> for Flags {
    type Output = Self;

    #[inline]
    fn bitxor(self, rhs: Flags) -> Self::Output {
        Self(self.0 ^ rhs.0)
    }
}

raw_enum! {
    /// A single type code as it appears in signature text.
    #[repr(u8)]
    pub enum Type {
        /// `y`, an unsigned byte.
        BYTE = b'y',
        /// `b`, a boolean marshalled as a 4-byte 0 or 1.
        BOOLEAN = b'b',
        /// `n`, a signed 16-bit integer.
        INT16 = b'n',
        /// `q`, an unsigned 16-bit integer.
        UINT16 = b'q',
        /// `i`, a signed 32-bit integer.
        INT32 = b'i',
        /// `u`, an unsigned 32-bit integer.
        UINT32 = b'u',
        /// `x`, a signed 64-bit integer.
        INT64 = b'x',
        /// `t`, an unsigned 64-bit integer.
        UINT64 = b't',
        /// `d`, a double precision float.
        DOUBLE = b'd',
        /// `s`, a nul terminated UTF-8 string.
        STRING = b's',
        /// `o`, an object path.
        OBJECT_PATH = b'o',
        /// `g`, a signature with a single byte length.
        SIGNATURE = b'g',
        /// `a`, an array of the single complete type which follows.
        ARRAY = b'a',
        /// `(`, opens a struct.
        OPEN_PAREN = b'(',
        /// `)`, closes a struct.
        CLOSE_PAREN = b')',
        /// `v`, a value carrying its own signature.
        VARIANT = b'v',
        /// `{`, opens a dict entry.
        OPEN_BRACE = b'{',
        /// `}`, closes a dict entry.
        CLOSE_BRACE = b'}',
        /// `h`, an index into out-of-band file descriptors.
        UNIX_FD = b'h',
    }
}

impl Type {
    /// Construct a type from its raw code.
    #[inline]
    pub const fn new(code: u8) -> Self {
        Self(code)
    }

    /// The raw type code.
    #[inline]
    pub const fn code(self) -> u8 {
        self.0
    }
}
