// src/rewrite.rs
//
// Single-pass rewriter.
//
// Scanning -> span -> classify -> { passthrough: emit as-is
//                                 | ordinary tag: match-decide -> { suppress | emit } }
//
// - Text and untouched tags are copied from the source verbatim.
// - The path stack records every open element together with what the rule
//   decided for it, so the close tag that pops an entry gets the same
//   treatment (dropped, renamed, or copied).
// - Delete drops the matched element and its whole subtree: from the matched
//   open tag until the entry it pushed is popped, nothing is emitted.
// - A void open tag (`<img ...>`) never waits for a close, but when the very
//   next tag is its explicit `</img>`, that close gets the same treatment.
// - Everything between <svg> and its matching </svg> is opaque.
// - Nesting mismatches are logged and counted, never fatal. A close tag pops
//   down to the nearest open entry of the same name; a close tag with no such
//   entry is a stray and leaves the stack alone.

use crate::criteria::{Action, Criteria, Rule};
use crate::scanner::{Scanner, Segment};
use crate::tag::{classify, write_tag, Attributes, PassthroughKind, Tag, TagDisplay, TagKind, Token};

/// Decision attached to an open element on the path stack.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Mark {
    Keep,
    Suppress,
    Unwrap,
    Rename(String),
}

#[derive(Debug)]
struct OpenElement {
    name: String,
    mark: Mark,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RewriteStats {
    /// Open or self-closing tags the rule matched.
    pub matched: usize,
    /// Close tags that did not pair with the innermost open element.
    pub nesting_mismatches: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rewrite {
    pub output: String,
    pub stats: RewriteStats,
}

impl Rewrite {
    pub fn changed(&self, source: &str) -> bool {
        self.output != source
    }
}

/// Rewrite `source` according to `criteria`.
///
/// A regex that does not compile matches nothing, so `source` comes back
/// unchanged; callers that want to report it run `Criteria::validate` first.
pub fn process(source: &str, criteria: &Criteria) -> String {
    match criteria.compile() {
        Ok(rule) => rule.rewrite(source).output,
        Err(err) => {
            log::warn!(target: "retag.rewrite", "rule not applied: {err}");
            source.to_string()
        }
    }
}

impl Rule {
    /// Run this rule over one document.
    pub fn rewrite(&self, source: &str) -> Rewrite {
        let mut state = State::new(source.len());
        for segment in Scanner::new(source) {
            log::trace!(target: "retag.scanner", "{segment:?}");
            match segment {
                Segment::Text(text) => state.emit(text),
                Segment::Tag(span) => self.handle_span(&mut state, span),
            }
        }
        state.finish()
    }

    fn handle_span(&self, state: &mut State, span: &str) {
        let token = classify(span);
        let void = state.pending_void.take();

        if state.svg_depth > 0 {
            if let Token::Passthrough(p) = &token {
                match p.kind {
                    PassthroughKind::SvgStart { self_closing: false } => state.svg_depth += 1,
                    PassthroughKind::SvgEnd => state.svg_depth -= 1,
                    _ => {}
                }
            }
            state.emit(span);
            return;
        }

        match token {
            Token::Text(text) => state.emit(text),
            Token::Passthrough(p) => {
                match p.kind {
                    PassthroughKind::SvgStart { self_closing: false } => state.svg_depth = 1,
                    PassthroughKind::SvgEnd => {
                        log::debug!(target: "retag.rewrite", "stray {:?} outside any svg", span)
                    }
                    _ => {}
                }
                if !state.suppressing() {
                    p.write_to(&mut state.out);
                }
            }
            Token::Tag(tag) if tag.kind == TagKind::Close => match void {
                Some(void) if void.name == tag.name => state.close_as(void.mark, tag.raw),
                _ => self.close(state, tag),
            },
            Token::Tag(tag) => self.open(state, tag),
        }
    }

    fn open(&self, state: &mut State, tag: Tag<'_>) {
        let suppressing = state.suppressing();
        let mark = if suppressing {
            Mark::Suppress
        } else if !self.matches(&tag) {
            state.out.push_str(tag.raw);
            Mark::Keep
        } else {
            state.stats.matched += 1;
            match self.action() {
                Action::Delete => {
                    log::debug!(target: "retag.rewrite", "delete {}", tag.raw);
                    Mark::Suppress
                }
                Action::Unwrap => {
                    log::debug!(target: "retag.rewrite", "unwrap {}", tag.raw);
                    Mark::Unwrap
                }
                Action::Modify => {
                    let name = self.renamed(&tag.name).to_string();
                    let attrs = self.rewritten_attributes(&tag.attributes);
                    log::debug!(
                        target: "retag.rewrite",
                        "modify {} -> {}",
                        tag.raw,
                        TagDisplay { kind: tag.kind, name: &name, attrs: &attrs }
                    );
                    write_tag(&mut state.out, tag.kind, &name, &attrs);
                    Mark::Rename(name)
                }
            }
        };

        if tag.opens_element() {
            if mark == Mark::Suppress && !suppressing {
                state.suppress_from = Some(state.path.len());
            }
            state.push(tag.name, mark);
        } else if tag.is_void_open() {
            state.pending_void = Some(OpenElement { name: tag.name, mark });
        }
    }

    fn close(&self, state: &mut State, tag: Tag<'_>) {
        let Some(depth) = state.path.iter().rposition(|e| e.name == tag.name) else {
            state.stats.nesting_mismatches += 1;
            log::warn!(
                target: "retag.rewrite",
                "improper nesting: stray {} with open path {:?}",
                tag.raw,
                state.path_names()
            );
            if !state.suppressing() {
                state.out.push_str(tag.raw);
            }
            return;
        };

        if depth + 1 != state.path.len() {
            state.stats.nesting_mismatches += 1;
            log::warn!(
                target: "retag.rewrite",
                "improper nesting: {} closes {:?}",
                tag.raw,
                &state.path_names()[depth..]
            );
            state.path.truncate(depth + 1);
        }
        let Some(entry) = state.path.pop() else {
            return;
        };

        match state.suppress_from {
            // Still inside a deleted subtree.
            Some(from) if from < depth => return,
            // The deleted element itself, or something enclosing it, just closed.
            Some(_) => state.suppress_from = None,
            None => {}
        }

        state.close_as(entry.mark, tag.raw);
    }
}

/// Per-run state. Created fresh for every document.
struct State {
    out: String,
    path: Vec<OpenElement>,
    /// Index into `path` of the deleted element currently being skipped.
    suppress_from: Option<usize>,
    svg_depth: usize,
    /// Void open tag seen as the previous tag, for an explicit close right after it.
    pending_void: Option<OpenElement>,
    stats: RewriteStats,
}

impl State {
    fn new(capacity: usize) -> Self {
        Self {
            out: String::with_capacity(capacity),
            path: Vec::new(),
            suppress_from: None,
            svg_depth: 0,
            pending_void: None,
            stats: RewriteStats::default(),
        }
    }

    #[inline]
    fn suppressing(&self) -> bool {
        self.suppress_from.is_some()
    }

    fn emit(&mut self, text: &str) {
        if !self.suppressing() {
            self.out.push_str(text);
        }
    }

    /// Emit the close tag of an element carrying `mark`.
    fn close_as(&mut self, mark: Mark, raw: &str) {
        match mark {
            Mark::Keep => self.out.push_str(raw),
            Mark::Suppress | Mark::Unwrap => {}
            Mark::Rename(name) => write_tag(&mut self.out, TagKind::Close, &name, &Attributes::new()),
        }
    }

    fn push(&mut self, name: String, mark: Mark) {
        self.path.push(OpenElement { name, mark });
    }

    fn path_names(&self) -> Vec<&str> {
        self.path.iter().map(|e| e.name.as_str()).collect()
    }

    fn finish(self) -> Rewrite {
        if let Some(from) = self.suppress_from {
            log::warn!(
                target: "retag.rewrite",
                "deleted <{}> never closed; dropped everything after it",
                self.path[from].name
            );
        }
        if self.svg_depth > 0 {
            log::debug!(target: "retag.rewrite", "unterminated <svg> at end of input");
        }
        if !self.path.is_empty() {
            log::debug!(target: "retag.rewrite", "left open at end of input: {:?}", self.path_names());
        }
        Rewrite {
            output: self.out,
            stats: self.stats,
        }
    }
}
