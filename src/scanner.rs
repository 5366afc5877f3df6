// src/scanner.rs
//
// Text/tag segmentation.
//
// - A segment is either a literal text run up to (not including) the next '<',
//   or a complete span from '<' to its terminator.
// - Comments scan to the first "-->", CDATA sections to the first "]]>"; an
//   unterminated one runs to end of input.
// - Any other span scans to the next '>'. If a '<' shows up first, or there is
//   no '>' at all, the region is handed back as text instead.
// - Every cut lands on an ASCII delimiter, so slicing never splits a UTF-8
//   sequence.

use memchr::{memchr, memmem};

/// One lexical unit of the source text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Tag(&'a str),
}

impl<'a> Segment<'a> {
    pub fn as_str(&self) -> &'a str {
        match *self {
            Segment::Text(s) | Segment::Tag(s) => s,
        }
    }
}

/* ================================ Cursor ================================= */

/// Forward-only byte cursor over a `&str`.
#[derive(Clone, Debug)]
pub struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    #[inline]
    pub fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    pub fn starts_with(&self, pat: &str) -> bool {
        self.rest().as_bytes().starts_with(pat.as_bytes())
    }

    pub fn starts_with_ignore_ascii_case(&self, pat: &str) -> bool {
        let rest = self.rest().as_bytes();
        rest.len() >= pat.len() && rest[..pat.len()].eq_ignore_ascii_case(pat.as_bytes())
    }

    /// Absolute index of the first `b` at or after `pos + skip`.
    pub fn find_byte(&self, b: u8, skip: usize) -> Option<usize> {
        self.find_byte_before(b, skip, None)
    }

    /// Like `find_byte`, but stops looking at the absolute index `limit`.
    pub fn find_byte_before(&self, b: u8, skip: usize, limit: Option<usize>) -> Option<usize> {
        let len = self.src.len();
        let from = (self.pos + skip).min(len);
        let to = limit.map_or(len, |l| l.clamp(from, len));
        memchr(b, &self.src.as_bytes()[from..to]).map(|off| from + off)
    }

    /// Absolute index of the first `pat` at or after `pos + skip`.
    pub fn find_str(&self, pat: &str, skip: usize) -> Option<usize> {
        let from = (self.pos + skip).min(self.src.len());
        memmem::find(&self.src.as_bytes()[from..], pat.as_bytes()).map(|off| from + off)
    }

    /// Consume everything up to the absolute index `end`.
    pub fn take_to(&mut self, end: usize) -> &'a str {
        let start = self.pos;
        let end = end.clamp(start, self.src.len());
        self.pos = end;
        &self.src[start..end]
    }
}

/* ================================ Scanner ================================ */

#[derive(Clone, Debug)]
pub struct Scanner<'a> {
    cursor: Cursor<'a>,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            cursor: Cursor::new(src),
        }
    }

    /// Produce the next segment, or `None` at end of input.
    pub fn next_segment(&mut self) -> Option<Segment<'a>> {
        let c = &mut self.cursor;
        if c.peek()? != b'<' {
            let end = c.find_byte(b'<', 0).unwrap_or(usize::MAX);
            return Some(Segment::Text(c.take_to(end)));
        }

        if c.starts_with("<!--") {
            // Searching from offset 2 lets "<!-->" close on itself.
            return Some(Segment::Tag(take_delimited(c, 2, "-->")));
        }
        if c.starts_with_ignore_ascii_case("<![CDATA[") {
            return Some(Segment::Tag(take_delimited(c, 9, "]]>")));
        }

        // Only look for '>' up to the next '<', so a run of bare '<' stays linear.
        let lt = c.find_byte(b'<', 1);
        let segment = match c.find_byte_before(b'>', 1, lt) {
            Some(gt) => Segment::Tag(c.take_to(gt + 1)),
            None => Segment::Text(c.take_to(lt.unwrap_or(usize::MAX))),
        };
        if let Segment::Text(text) = segment {
            log::trace!(target: "retag.scanner", "unterminated tag kept as text: {text:?}");
        }
        Some(segment)
    }
}

/// Take through the first `close` found at or after `skip`, or to end of input.
fn take_delimited<'a>(c: &mut Cursor<'a>, skip: usize, close: &str) -> &'a str {
    match c.find_str(close, skip) {
        Some(at) => c.take_to(at + close.len()),
        None => c.take_to(usize::MAX),
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_segment()
    }
}
