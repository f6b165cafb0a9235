use std::fmt;
use std::num::NonZeroU32;

/// The serial of a message, assigned by the transport when it is sent.
///
/// # Examples
///
/// ```
/// use dynbus::Serial;
///
/// let serial = Serial::new(1).unwrap();
/// assert_eq!(serial.get(), 1);
/// assert_eq!(serial.next().get(), 2);
/// assert_eq!(Serial::new(u32::MAX).unwrap().next().get(), 1);
/// assert!(Serial::new(0).is_none());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Serial(NonZeroU32);

impl Serial {
    /// The first serial handed out on a connection.
    pub const FIRST: Self = Self(NonZeroU32::MIN);

    /// Construct a serial, which must be non-zero.
    #[inline]
    pub const fn new(serial: u32) -> Option<Self> {
        match NonZeroU32::new(serial) {
            Some(serial) => Some(Self(serial)),
            None => None,
        }
    }

    /// Get the raw serial.
    #[inline]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// The serial following this one, skipping zero on wrap-around.
    #[inline]
    pub fn next(self) -> Self {
        match NonZeroU32::new(self.0.get().wrapping_add(1)) {
            Some(serial) => Self(serial),
            None => Self::FIRST,
        }
    }
}

impl fmt::Display for Serial {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for Serial {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
