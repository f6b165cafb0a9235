use std::borrow::Borrow;
use std::fmt;

use super::{validate, Iter, ObjectPathError};

/// A validated object path.
///
/// The following rules define a [valid object path]. Implementations must not
/// send or accept messages with invalid object paths.
///
/// [valid object path]: https://dbus.freedesktop.org/doc/dbus-specification.html#message-protocol-marshaling-object-path
///
/// * The path may be of any length.
/// * The path must begin with an ASCII '/' (integer 47) character, and must
///   consist of elements separated by slash characters.
/// * Each element must only contain the ASCII characters "[A-Z][a-z][0-9]_"
/// * No element may be the empty string.
/// * Multiple '/' characters cannot occur in sequence.
/// * A trailing '/' character is not allowed unless the path is the root path
///   (a single '/' character).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectPath(Box<str>);

impl ObjectPath {
    /// The special `"/"` object path.
    ///
    /// # Examples
    ///
    /// ```
    /// use dynbus::ObjectPath;
    ///
    /// assert_eq!(ObjectPath::root(), ObjectPath::new("/")?);
    /// # Ok::<_, dynbus::Error>(())
    /// ```
    pub fn root() -> Self {
        Self(Box::from("/"))
    }

    /// Construct a new validated object path.
    ///
    /// # Errors
    ///
    /// Errors if the argument is not a valid object path.
    ///
    /// See [`ObjectPath`] for more information.
    pub fn new<P>(path: P) -> Result<Self, ObjectPathError>
    where
        P: AsRef<str>,
    {
        let path = path.as_ref();

        if !validate(path) {
            return Err(ObjectPathError(path.into()));
        }

        Ok(Self(path.into()))
    }

    /// Construct an iterator over the elements of the object path.
    ///
    /// # Examples
    ///
    /// ```
    /// use dynbus::ObjectPath;
    ///
    /// let path = ObjectPath::new("/foo/bar")?;
    /// let mut it = path.iter();
    /// assert_eq!(it.next_back(), Some("bar"));
    /// assert_eq!(it.next(), Some("foo"));
    /// assert!(it.next().is_none());
    /// # Ok::<_, dynbus::Error>(())
    /// ```
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(&self.0)
    }

    /// Test if `other` is an element-wise prefix of this path.
    ///
    /// # Examples
    ///
    /// ```
    /// use dynbus::ObjectPath;
    ///
    /// let foo = ObjectPath::new("/foo")?;
    /// assert!(ObjectPath::new("/foo/bar")?.starts_with(&foo));
    /// assert!(!ObjectPath::new("/foobar")?.starts_with(&foo));
    /// # Ok::<_, dynbus::Error>(())
    /// ```
    #[must_use]
    pub fn starts_with(&self, other: &ObjectPath) -> bool {
        let mut this = self.iter();
        other.iter().all(|element| this.next() == Some(element))
    }

    /// Get the object path as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectPath {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for ObjectPath {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for ObjectPath {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ObjectPath {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for ObjectPath {
    type Error = ObjectPathError;

    #[inline]
    fn try_from(path: &str) -> Result<Self, Self::Error> {
        Self::new(path)
    }
}

impl<'a> IntoIterator for &'a ObjectPath {
    type Item = &'a str;
    type IntoIter = Iter<'a>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
