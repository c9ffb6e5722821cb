use std::fmt::Display;

/// A byte offset into the tokenised text
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BytePos(usize);

impl BytePos {
    pub const fn new(pos: usize) -> Self {
        BytePos(pos)
    }

    pub fn shift(self, ch: char) -> Self {
        BytePos(self.0 + ch.len_utf8())
    }

    pub const fn offset(self) -> usize {
        self.0
    }
}

impl Display for BytePos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A subsection of the tokenised text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Starting position (inclusive)
    pub start: BytePos,
    /// Ending position (exclusive)
    pub end: BytePos,
}

impl Span {
    pub const fn new(start: BytePos, end: BytePos) -> Span {
        Span { start, end }
    }

    /// Zero-width span at the given position, used for end of input.
    pub const fn point(at: BytePos) -> Span {
        Span { start: at, end: at }
    }

    /// Convert the given span to the "(at 1:4)" format
    pub fn at_str(&self) -> String {
        format!("(at {})", self)
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WithSpan<T> {
    pub value: T,
    pub span: Span,
}

impl<T> WithSpan<T> {
    pub const fn new(value: T, span: Span) -> WithSpan<T> {
        WithSpan { value, span }
    }
}

impl<T> WithSpan<T>
where
    T: Display,
{
    /// Convert the given WithSpan to the "value (at 1:4)" format
    /// See Span::at_str() for detail
    pub fn at_str(&self) -> String {
        format!("{} {}", self.value, self.span.at_str())
    }
}
