//! Minimal glob matching for `/`-separated relative paths.
//!
//! Supported syntax:
//! - `**` as a whole segment matches zero or more path segments
//! - `*` matches any run of characters inside one segment
//! - `?` matches exactly one character inside one segment
//! - `[abc]`, `[a-z]`, `[!a-z]` / `[^a-z]` match one character from a class
//! - `\x` matches `x` literally
//!
//! Compilation never fails. A malformed pattern (an unterminated `[`) compiles
//! to a pattern that matches nothing.

/// A compiled glob pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    /// `None` when the pattern failed to parse.
    segments: Option<Vec<Segment>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    AnyDepth,
    Tokens(Vec<Token>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(char),
    AnyChar,
    AnyRun,
    Class {
        negated: bool,
        ranges: Vec<(char, char)>,
    },
}

impl Pattern {
    pub fn new(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(parse_segment)
            .collect::<Option<Vec<_>>>();
        Self {
            source: pattern.to_string(),
            segments,
        }
    }

    /// The pattern text as given.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the pattern parsed. Invalid patterns never match.
    pub fn is_valid(&self) -> bool {
        self.segments.is_some()
    }

    /// Match against a `/`-separated path. Empty segments are ignored, so
    /// `a//b/` and `a/b` are the same path.
    pub fn matches(&self, path: &str) -> bool {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        self.matches_segments(&parts)
    }

    /// Match against a path that has already been split into segments.
    pub fn matches_segments(&self, parts: &[&str]) -> bool {
        match &self.segments {
            Some(segments) => match_segments(segments, parts),
            None => false,
        }
    }
}

fn parse_segment(segment: &str) -> Option<Segment> {
    if segment == "**" {
        return Some(Segment::AnyDepth);
    }

    let mut tokens = Vec::new();
    let mut chars = segment.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                // Collapse `**` inside a segment (e.g. `a**b`) to a single run.
                if tokens.last() != Some(&Token::AnyRun) {
                    tokens.push(Token::AnyRun);
                }
            }
            '?' => tokens.push(Token::AnyChar),
            '\\' => tokens.push(Token::Literal(chars.next().unwrap_or('\\'))),
            '[' => {
                let mut negated = false;
                if let Some(&('!' | '^')) = chars.peek() {
                    negated = true;
                    chars.next();
                }

                let mut ranges = Vec::new();
                let mut closed = false;
                let mut first = true;
                while let Some(c) = chars.next() {
                    if c == ']' && !first {
                        closed = true;
                        break;
                    }
                    first = false;

                    let start = c;
                    let mut lookahead = chars.clone();
                    if lookahead.next() == Some('-')
                        && let Some(end) = lookahead.next()
                        && end != ']'
                    {
                        chars.next();
                        chars.next();
                        ranges.push((start, end));
                    } else {
                        ranges.push((start, start));
                    }
                }

                if !closed {
                    return None;
                }
                tokens.push(Token::Class { negated, ranges });
            }
            c => tokens.push(Token::Literal(c)),
        }
    }
    Some(Segment::Tokens(tokens))
}

fn match_segments(pattern: &[Segment], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((Segment::AnyDepth, rest)) => {
            match_segments(rest, path)
                || (!path.is_empty() && match_segments(pattern, &path[1..]))
        }
        Some((Segment::Tokens(tokens), rest)) => match path.split_first() {
            Some((head, tail)) => {
                let chars: Vec<char> = head.chars().collect();
                match_tokens(tokens, &chars) && match_segments(rest, tail)
            }
            None => false,
        },
    }
}

fn match_tokens(tokens: &[Token], text: &[char]) -> bool {
    match tokens.split_first() {
        None => text.is_empty(),
        Some((Token::AnyRun, rest)) => (0..=text.len()).any(|i| match_tokens(rest, &text[i..])),
        Some((token, rest)) => match text.split_first() {
            Some((c, tail)) => token_matches(token, *c) && match_tokens(rest, tail),
            None => false,
        },
    }
}

fn token_matches(token: &Token, c: char) -> bool {
    match token {
        Token::Literal(l) => *l == c,
        Token::AnyChar | Token::AnyRun => true,
        Token::Class { negated, ranges } => {
            let hit = ranges.iter().any(|(lo, hi)| (*lo..=*hi).contains(&c));
            hit != *negated
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_stays_within_segment() {
        let p = Pattern::new("*.js");
        assert!(p.matches("index.js"));
        assert!(!p.matches("lib/index.js"));
        assert!(!p.matches("index.json"));
    }

    #[test]
    fn test_double_star_crosses_segments() {
        let p = Pattern::new("**/*.xpi");
        assert!(p.matches("a.xpi"));
        assert!(p.matches("dist/a.xpi"));
        assert!(p.matches("very/deep/tree/a.xpi"));
        assert!(!p.matches("a.xpi.bak"));
    }

    #[test]
    fn test_double_star_in_the_middle() {
        let p = Pattern::new("src/**/test");
        assert!(p.matches("src/test"));
        assert!(p.matches("src/a/b/test"));
        assert!(!p.matches("lib/a/test"));
    }

    #[test]
    fn test_hidden_segment_pattern() {
        let p = Pattern::new("**/.*");
        assert!(p.matches(".git"));
        assert!(p.matches("sub/.DS_Store"));
        assert!(!p.matches("sub/file.txt"));
    }

    #[test]
    fn test_question_mark_and_classes() {
        assert!(Pattern::new("file?.txt").matches("file1.txt"));
        assert!(!Pattern::new("file?.txt").matches("file.txt"));
        assert!(Pattern::new("[a-c]x").matches("bx"));
        assert!(!Pattern::new("[a-c]x").matches("dx"));
        assert!(Pattern::new("[!a-c]x").matches("dx"));
        assert!(Pattern::new("[^a-c]x").matches("dx"));
        assert!(Pattern::new("[]]").matches("]"));
    }

    #[test]
    fn test_escape_is_literal() {
        assert!(Pattern::new(r"\*.txt").matches("*.txt"));
        assert!(!Pattern::new(r"\*.txt").matches("a.txt"));
    }

    #[test]
    fn test_malformed_pattern_never_matches() {
        let p = Pattern::new("[abc");
        assert!(!p.is_valid());
        assert!(!p.matches("a"));
        assert!(!p.matches("[abc"));
    }

    #[test]
    fn test_empty_segments_are_ignored() {
        let p = Pattern::new("a//b/");
        assert!(p.matches("a/b"));
        assert!(Pattern::new("a/b").matches("/a//b"));
    }
}
