use std::fmt;

/// A pair of values, one of which is expected and one of which is actual.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct GotExpected<T> {
    /// The actual value.
    pub got: T,
    /// The expected value.
    pub expected: T,
}

impl<T> GotExpected<T> {
    /// Creates a new error from a pair of values.
    pub const fn new(got: T, expected: T) -> Self {
        Self { got, expected }
    }
}

impl<T: fmt::Display> fmt::Display for GotExpected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "got {}, expected {}", self.got, self.expected)
    }
}

impl<T: fmt::Debug + fmt::Display> std::error::Error for GotExpected<T> {}

impl<T> From<(T, T)> for GotExpected<T> {
    #[inline]
    fn from((got, expected): (T, T)) -> Self {
        Self::new(got, expected)
    }
}
