use std::mem::replace;

/// An iterator over the elements of an [`ObjectPath`].
///
/// [`ObjectPath`]: crate::ObjectPath
pub struct Iter<'a> {
    data: &'a str,
}

impl<'a> Iter<'a> {
    pub(super) fn new(data: &'a str) -> Self {
        // NB: trim leading '/'.
        Self { data: &data[1..] }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.is_empty() {
            return None;
        }

        let data = match self.data.split_once('/') {
            Some((head, tail)) => {
                self.data = tail;
                head
            }
            None => replace(&mut self.data, ""),
        };

        Some(data)
    }
}

impl<'a> DoubleEndedIterator for Iter<'a> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.data.is_empty() {
            return None;
        }

        let data = match self.data.rsplit_once('/') {
            Some((head, tail)) => {
                self.data = head;
                tail
            }
            None => replace(&mut self.data, ""),
        };

        Some(data)
    }
}
