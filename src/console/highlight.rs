// tui-devconsole/src/console/highlight.rs
//! Rendered node trees and reversible search highlighting.
//!
//! Every entry of the output stream is kept as a small tree of
//! [`RenderNode`]s. Highlighting a search term rewrites each matching
//! text leaf into a [`NodeRole::Matched`] wrapper holding alternating
//! text and [`RenderNode::Mark`] segments; removing highlights collapses
//! those wrappers back into the exact text leaf they replaced, so a
//! mark/unmark cycle always restores the original tree.

use regex::{Regex, RegexBuilder};

use super::Category;

/// What an element node stands for when it is laid out and styled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRole {
    /// Starts a new output line, indented by the given number of cells.
    Block { indent: u16 },
    Timestamp,
    Indicator(Category),
    Content(Category),
    Prompt,
    Command,
    Result,
    Error,
    Key,
    /// Collapsed/expanded placeholder of a composite value. `path` is the
    /// list of child indices leading to it from the root value.
    Toggle { path: Vec<usize>, expanded: bool },
    /// Wrapper produced by highlighting; replaced a single text leaf.
    Matched,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderNode {
    Text(String),
    Mark(String),
    Element {
        role: NodeRole,
        children: Vec<RenderNode>,
    },
}

impl RenderNode {
    pub fn text(text: impl Into<String>) -> Self {
        RenderNode::Text(text.into())
    }

    pub fn element(role: NodeRole, children: Vec<RenderNode>) -> Self {
        RenderNode::Element { role, children }
    }

    pub fn block(indent: u16, children: Vec<RenderNode>) -> Self {
        Self::element(NodeRole::Block { indent }, children)
    }

    /// An element holding a single text leaf.
    pub fn labeled(role: NodeRole, text: impl Into<String>) -> Self {
        Self::element(role, vec![Self::text(text)])
    }

    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            RenderNode::Text(text) | RenderNode::Mark(text) => out.push_str(text),
            RenderNode::Element { children, .. } => {
                for child in children {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Strips every highlight marker below this node.
    pub fn unmark(&mut self) {
        match self {
            RenderNode::Text(_) => {}
            RenderNode::Mark(text) => {
                let text = std::mem::take(text);
                *self = RenderNode::Text(text);
            }
            RenderNode::Element {
                role: NodeRole::Matched,
                ..
            } => {
                let text = self.plain_text();
                *self = RenderNode::Text(text);
            }
            RenderNode::Element { children, .. } => {
                for child in children {
                    child.unmark();
                }
            }
        }
    }

    /// Wraps every match of `pattern` found in the text leaves below this
    /// node. Expects an unmarked tree; returns the number of marks added.
    pub fn mark(&mut self, pattern: &SearchPattern) -> usize {
        match self {
            RenderNode::Text(text) => {
                let segments = pattern.segments(text);
                let marks = segments.iter().filter(|s| s.is_match).count();
                if marks > 0 {
                    let children = segments
                        .into_iter()
                        .map(|segment| {
                            if segment.is_match {
                                RenderNode::Mark(segment.text.to_string())
                            } else {
                                RenderNode::Text(segment.text.to_string())
                            }
                        })
                        .collect();
                    *self = RenderNode::element(NodeRole::Matched, children);
                }
                marks
            }
            RenderNode::Mark(_) => 0,
            RenderNode::Element { children, .. } => {
                children.iter_mut().map(|child| child.mark(pattern)).sum()
            }
        }
    }

    pub fn count_marks(&self) -> usize {
        match self {
            RenderNode::Text(_) => 0,
            RenderNode::Mark(_) => 1,
            RenderNode::Element { children, .. } => children.iter().map(Self::count_marks).sum(),
        }
    }

    /// Marked substrings, left to right.
    pub fn marks(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_marks(&mut out);
        out
    }

    fn collect_marks<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            RenderNode::Text(_) => {}
            RenderNode::Mark(text) => out.push(text),
            RenderNode::Element { children, .. } => {
                for child in children {
                    child.collect_marks(out);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'t> {
    pub text: &'t str,
    pub is_match: bool,
}

/// A case-insensitive literal search term.
#[derive(Debug, Clone)]
pub struct SearchPattern {
    regex: Regex,
}

impl SearchPattern {
    /// `None` for the empty term, which highlights nothing.
    pub fn new(term: &str) -> Option<Self> {
        if term.is_empty() {
            return None;
        }
        RegexBuilder::new(&regex::escape(term))
            .case_insensitive(true)
            .build()
            .ok()
            .map(|regex| Self { regex })
    }

    /// Splits `text` into alternating unmatched/matched runs. Matches are
    /// found greedily left to right and never overlap.
    pub fn segments<'t>(&self, text: &'t str) -> Vec<Segment<'t>> {
        let mut segments = Vec::new();
        let mut last = 0;
        for found in self.regex.find_iter(text) {
            if found.start() > last {
                segments.push(Segment {
                    text: &text[last..found.start()],
                    is_match: false,
                });
            }
            segments.push(Segment {
                text: found.as_str(),
                is_match: true,
            });
            last = found.end();
        }
        if last < text.len() {
            segments.push(Segment {
                text: &text[last..],
                is_match: false,
            });
        }
        segments
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Holds the current search term and (re)applies it to rendered nodes.
#[derive(Debug, Clone, Default)]
pub struct SearchHighlighter {
    term: String,
    pattern: Option<SearchPattern>,
}

impl SearchHighlighter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn set_term(&mut self, term: impl Into<String>) {
        self.term = term.into();
        self.pattern = SearchPattern::new(&self.term);
    }

    pub fn is_active(&self) -> bool {
        self.pattern.is_some()
    }

    /// Clears and re-marks every node. Returns the index of the first
    /// node that contains a match, if any.
    pub fn apply<'a>(&self, nodes: impl IntoIterator<Item = &'a mut RenderNode>) -> Option<usize> {
        let mut first = None;
        for (idx, node) in nodes.into_iter().enumerate() {
            if self.highlight(node) > 0 && first.is_none() {
                first = Some(idx);
            }
        }
        first
    }

    /// Re-marks a single node with the current term.
    pub fn highlight(&self, node: &mut RenderNode) -> usize {
        node.unmark();
        match &self.pattern {
            Some(pattern) => node.mark(pattern),
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_node(text: &str) -> RenderNode {
        RenderNode::block(
            0,
            vec![
                RenderNode::labeled(NodeRole::Indicator(Category::Log), "LOG: "),
                RenderNode::labeled(NodeRole::Content(Category::Log), text),
            ],
        )
    }

    fn marked(text: &str, term: &str) -> RenderNode {
        let mut node = message_node(text);
        let mut highlighter = SearchHighlighter::new();
        highlighter.set_term(term);
        highlighter.highlight(&mut node);
        node
    }

    #[test]
    fn unmark_restores_the_original_tree() {
        let cases = [
            ("hello world", "o"),
            ("hello world", ""),
            ("Hello HELLO hello", "hello"),
            ("aaaa", "aa"),
            ("nothing here", "zzz"),
            ("dots. and (parens)", "."),
            ("ünïcödé ÜNÏ", "ünï"),
        ];
        for (text, term) in cases {
            let mut node = marked(text, term);
            node.unmark();
            assert_eq!(node, message_node(text), "term {term:?} over {text:?}");
        }
    }

    #[test]
    fn empty_term_highlights_nothing() {
        let node = marked("hello", "");
        assert_eq!(node.count_marks(), 0);
        assert_eq!(node, message_node("hello"));
    }

    #[test]
    fn matches_are_case_insensitive_and_keep_original_case() {
        let node = marked("Error: error ERROR", "error");
        // the indicator leaf "LOG: " has no match; the content has three
        assert_eq!(node.marks(), ["Error", "error", "ERROR"]);
        assert_eq!(node.plain_text(), "LOG: Error: error ERROR");
    }

    #[test]
    fn adjacent_matches_are_all_marked_without_overlap() {
        let node = marked("aaaaa", "aa");
        assert_eq!(node.marks(), ["aa", "aa"]);
        assert_eq!(node.plain_text(), "LOG: aaaaa");
    }

    #[test]
    fn term_is_matched_literally() {
        let node = marked("a.b axb", ".");
        assert_eq!(node.marks(), ["."]);
    }

    #[test]
    fn matches_do_not_cross_leaf_boundaries() {
        // "LOG: " + "x" would contain ": x" only across two leaves
        let node = marked("x", ": x");
        assert_eq!(node.count_marks(), 0);
    }

    #[test]
    fn remarking_replaces_previous_highlights() {
        let mut node = marked("alpha beta", "alpha");
        let mut highlighter = SearchHighlighter::new();
        highlighter.set_term("beta");
        highlighter.highlight(&mut node);
        assert_eq!(node.marks(), ["beta"]);
    }

    #[test]
    fn apply_reports_first_matching_node() {
        let mut nodes = vec![
            message_node("nothing"),
            message_node("first hit"),
            message_node("second hit"),
        ];
        let mut highlighter = SearchHighlighter::new();
        highlighter.set_term("HIT");
        assert_eq!(highlighter.apply(nodes.iter_mut()), Some(1));

        highlighter.set_term("absent");
        assert_eq!(highlighter.apply(nodes.iter_mut()), None);
        assert!(nodes.iter().all(|node| node.count_marks() == 0));
    }

    #[test]
    fn segments_cover_the_whole_text() {
        let pattern = SearchPattern::new("ab").unwrap();
        let segments = pattern.segments("xabyAB");
        let rebuilt: String = segments.iter().map(|s| s.text).collect();
        assert_eq!(rebuilt, "xabyAB");
        assert_eq!(
            segments,
            [
                Segment { text: "x", is_match: false },
                Segment { text: "ab", is_match: true },
                Segment { text: "y", is_match: false },
                Segment { text: "AB", is_match: true },
            ]
        );
    }
}
