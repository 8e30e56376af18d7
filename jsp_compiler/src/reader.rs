//! Backtrackable scanning reader over template source
//!
//! The reader is the only component that deals in character offsets. It
//! hands out [`Mark`]s at token boundaries and can be rewound to any mark it
//! produced, which is how the parser speculates on custom tags and optional
//! bodies.

use crate::utils::Mark;
use std::sync::Arc;

/// Character stream over one template resource
#[derive(Debug, Clone)]
pub struct JspReader {
    file: Arc<str>,
    resource_url: Option<Arc<str>>,
    chars: Vec<char>,
    /// Offsets of the first character of every line
    line_starts: Vec<usize>,
    pos: usize,
}

impl JspReader {
    pub fn new(file: &str, text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let mut line_starts = vec![0];
        for (idx, ch) in chars.iter().enumerate() {
            if *ch == '\n' {
                line_starts.push(idx + 1);
            }
        }
        Self {
            file: Arc::from(file),
            resource_url: None,
            chars,
            line_starts,
            pos: 0,
        }
    }

    pub fn with_resource_url(mut self, url: Option<String>) -> Self {
        self.resource_url = url.map(Arc::from);
        self
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    /// Snapshot of the current position
    pub fn mark(&self) -> Mark {
        self.mark_at(self.pos)
    }

    fn mark_at(&self, offset: usize) -> Mark {
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        let column = offset - self.line_starts[line_idx] + 1;
        let mark = Mark::new(self.file.clone(), (line_idx + 1) as u32, column as u32)
            .with_offset(offset);
        match &self.resource_url {
            Some(url) => mark.with_resource_url(url.clone()),
            None => mark,
        }
    }

    /// Rewind (or fast-forward) to a mark produced by this reader
    pub fn reset(&mut self, mark: &Mark) {
        self.pos = mark.offset().min(self.chars.len());
    }

    pub fn has_more_input(&self) -> bool {
        self.pos < self.chars.len()
    }

    pub fn peek_char(&self) -> Option<char> {
        self.peek_char_at(0)
    }

    pub fn peek_char_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    pub fn next_char(&mut self) -> Option<char> {
        let ch = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        Some(ch)
    }

    /// Un-consume the last character
    pub fn push_char(&mut self) {
        self.pos = self.pos.saturating_sub(1);
    }

    fn at(&self, offset: usize, literal: &str) -> bool {
        let mut idx = offset;
        for expected in literal.chars() {
            match self.chars.get(idx) {
                Some(ch) if *ch == expected => idx += 1,
                _ => return false,
            }
        }
        true
    }

    /// Consume `literal` if it is next in the input
    pub fn matches(&mut self, literal: &str) -> bool {
        if self.at(self.pos, literal) {
            self.pos += literal.chars().count();
            true
        } else {
            false
        }
    }

    /// Test for `literal` without consuming it
    pub fn looking_at(&self, literal: &str) -> bool {
        self.at(self.pos, literal)
    }

    pub fn is_space(&self) -> bool {
        matches!(self.peek_char(), Some(ch) if ch <= ' ')
    }

    /// Skip whitespace, returning how many characters were skipped
    pub fn skip_spaces(&mut self) -> usize {
        let mut count = 0;
        while self.is_space() {
            self.pos += 1;
            count += 1;
        }
        count
    }

    /// Advance past the next occurrence of `limit`.
    ///
    /// Returns the mark of the first character of the match, or `None` when
    /// the input runs out first (the reader is then at the end).
    pub fn skip_until(&mut self, limit: &str) -> Option<Mark> {
        let len = limit.chars().count();
        while self.pos < self.chars.len() {
            if self.at(self.pos, limit) {
                let start = self.mark_at(self.pos);
                self.pos += len;
                return Some(start);
            }
            self.pos += 1;
        }
        None
    }

    /// Like [`JspReader::skip_until`], but a backslash neutralizes the next
    /// character and `${..}` / `#{..}` spans are skipped as a whole unless
    /// `ignore_el` is set. A doubled backslash escapes nothing.
    pub fn skip_until_ignore_esc(&mut self, limit: &str, ignore_el: bool) -> Option<Mark> {
        let first = limit.chars().next()?;
        let len = limit.chars().count();
        let mut prev = 'x';
        while let Some(mut ch) = self.peek_char() {
            let here = self.pos;
            self.pos += 1;
            if ch == '\\' && prev == '\\' {
                ch = '\0';
            } else if prev == '\\' {
                prev = ch;
                continue;
            } else if !ignore_el && (ch == '$' || ch == '#') && self.peek_char() == Some('{') {
                self.pos += 1;
                self.skip_el_expression()?;
                ch = '}';
            } else if ch == first && self.at(here, limit) {
                self.pos = here + len;
                return Some(self.mark_at(here));
            }
            prev = ch;
        }
        None
    }

    /// Skip the body of an expression whose opener has been consumed.
    ///
    /// Quotes and nested braces are balanced; a backslash inside quotes
    /// escapes the next character. Returns the mark of the closing `}`.
    pub fn skip_el_expression(&mut self) -> Option<Mark> {
        let mut single_quoted = false;
        let mut double_quoted = false;
        let mut nesting: i32 = 0;
        loop {
            let mut last = self.pos;
            let mut ch = self.next_char()?;
            while ch == '\\' && (single_quoted || double_quoted) {
                self.next_char()?;
                last = self.pos;
                ch = self.next_char()?;
            }
            match ch {
                '"' if !single_quoted => double_quoted = !double_quoted,
                '\'' if !double_quoted => single_quoted = !single_quoted,
                '{' if !single_quoted && !double_quoted => nesting += 1,
                '}' if !single_quoted && !double_quoted => {
                    nesting -= 1;
                    if nesting < 0 {
                        return Some(self.mark_at(last));
                    }
                }
                _ => {}
            }
        }
    }

    /// Skip to the end tag `</tag>`; returns the mark of its `<`
    pub fn skip_until_etag(&mut self, tag: &str) -> Option<Mark> {
        let ret = self.skip_until(&format!("</{}", tag))?;
        self.skip_spaces();
        match self.next_char() {
            Some('>') => Some(ret),
            _ => None,
        }
    }

    /// Consume `</tag S? >` if it is next
    pub fn matches_etag(&mut self, tag: &str) -> bool {
        self.matches_close(&format!("</{}", tag))
    }

    /// Consume `/tag S? >` if it is next (the `<` was already consumed)
    pub fn matches_etag_without_less_than(&mut self, tag: &str) -> bool {
        self.matches_close(&format!("/{}", tag))
    }

    fn matches_close(&mut self, opener: &str) -> bool {
        let saved = self.pos;
        if !self.matches(opener) {
            return false;
        }
        self.skip_spaces();
        if self.next_char() == Some('>') {
            return true;
        }
        self.pos = saved;
        false
    }

    /// Consume optional whitespace followed by `literal`; on mismatch nothing
    /// is consumed
    pub fn matches_optional_spaces_followed_by(&mut self, literal: &str) -> bool {
        let saved = self.pos;
        self.skip_spaces();
        if self.matches(literal) {
            true
        } else {
            self.pos = saved;
            false
        }
    }

    fn is_delimiter(&self) -> bool {
        match self.peek_char() {
            None => true,
            Some(ch) if ch <= ' ' => true,
            Some('=' | '>' | '"' | '\'' | '/') => true,
            Some('-') => {
                matches!(self.peek_char_at(1), Some('>'))
                    || (self.peek_char_at(1) == Some('-') && self.peek_char_at(2) == Some('>'))
            }
            Some(_) => false,
        }
    }

    /// Read an unquoted token up to the next delimiter
    /// (whitespace, `=`, `>`, quotes, `/`, `->` or `-->`)
    pub fn parse_token(&mut self) -> String {
        let mut token = String::new();
        self.skip_spaces();
        while !self.is_delimiter() {
            let Some(mut ch) = self.next_char() else {
                break;
            };
            if ch == '\\' {
                if let Some(next @ ('"' | '\'' | '>' | '%')) = self.peek_char() {
                    self.pos += 1;
                    ch = next;
                }
            }
            token.push(ch);
        }
        token
    }

    /// Source text between two marks of this reader
    pub fn get_text(&self, from: &Mark, to: &Mark) -> String {
        let start = from.offset().min(self.chars.len());
        let end = to.offset().clamp(start, self.chars.len());
        self.chars[start..end].iter().collect()
    }

    /// Everything that has not been consumed yet
    pub fn remaining(&self) -> String {
        self.chars[self.pos..].iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marks_track_lines_and_columns() {
        let mut reader = JspReader::new("/a.jsp", "ab\ncd");
        assert_eq!(reader.mark(), Mark::new("/a.jsp", 1, 1));
        reader.next_char();
        reader.next_char();
        reader.next_char();
        assert_eq!(reader.mark(), Mark::new("/a.jsp", 2, 1));
        reader.next_char();
        assert_eq!(reader.mark(), Mark::new("/a.jsp", 2, 2));
        reader.push_char();
        assert_eq!(reader.peek_char(), Some('c'));
    }

    #[test]
    fn test_mark_and_reset() {
        let mut reader = JspReader::new("/a.jsp", "<x:y attr='1'/>");
        let start = reader.mark();
        assert!(reader.matches("<x:"));
        assert!(!reader.matches("z"));
        reader.reset(&start);
        assert!(reader.looking_at("<x:y"));
    }

    #[test]
    fn test_skip_until_returns_start_of_match() {
        let mut reader = JspReader::new("/a.jsp", "hello --%> rest");
        let start = reader.mark();
        let stop = reader.skip_until("--%>").unwrap();
        assert_eq!(reader.get_text(&start, &stop), "hello ");
        assert_eq!(reader.remaining(), " rest");

        let mut reader = JspReader::new("/a.jsp", "never closed");
        assert!(reader.skip_until("%>").is_none());
        assert!(!reader.has_more_input());
    }

    #[test]
    fn test_skip_until_ignore_esc() {
        let mut reader = JspReader::new("/a.jsp", r#"a\"b" tail"#);
        let start = reader.mark();
        let stop = reader.skip_until_ignore_esc("\"", true).unwrap();
        assert_eq!(reader.get_text(&start, &stop), r#"a\"b"#);

        let mut reader = JspReader::new("/a.jsp", r#"a\\" tail"#);
        let start = reader.mark();
        let stop = reader.skip_until_ignore_esc("\"", true).unwrap();
        assert_eq!(reader.get_text(&start, &stop), r#"a\\"#);
    }

    #[test]
    fn test_skip_until_ignore_esc_skips_expressions() {
        let mut reader = JspReader::new("/a.jsp", r#"${a == "b"}" next"#);
        let start = reader.mark();
        let stop = reader.skip_until_ignore_esc("\"", false).unwrap();
        assert_eq!(reader.get_text(&start, &stop), r#"${a == "b"}"#);
        assert_eq!(reader.remaining(), " next");
    }

    #[test]
    fn test_skip_el_expression_balances() {
        let mut reader = JspReader::new("/a.jsp", "{a: '}'}['x'] } after");
        let start = reader.mark();
        let last = reader.skip_el_expression().unwrap();
        assert_eq!(reader.get_text(&start, &last), "{a: '}'}['x'] ");
        assert_eq!(reader.remaining(), " after");

        let mut reader = JspReader::new("/a.jsp", "a + 'b");
        assert!(reader.skip_el_expression().is_none());
    }

    #[test]
    fn test_end_tags() {
        let mut reader = JspReader::new("/a.jsp", "</x:y  >rest");
        assert!(!reader.matches_etag("x:z"));
        assert!(reader.matches_etag("x:y"));
        assert_eq!(reader.remaining(), "rest");

        let mut reader = JspReader::new("/a.jsp", "raw <b>text</x:y>after");
        let start = reader.mark();
        let stop = reader.skip_until_etag("x:y").unwrap();
        assert_eq!(reader.get_text(&start, &stop), "raw <b>text");
        assert_eq!(reader.remaining(), "after");
    }

    #[test]
    fn test_parse_token_stops_at_delimiters() {
        let mut reader = JspReader::new("/a.jsp", "  c:out value='x'");
        assert_eq!(reader.parse_token(), "c:out");
        let mut reader = JspReader::new("/a.jsp", "c:if/>");
        assert_eq!(reader.parse_token(), "c:if");
        let mut reader = JspReader::new("/a.jsp", "a-->");
        assert_eq!(reader.parse_token(), "a");
    }

    #[test]
    fn test_optional_spaces_followed_by() {
        let mut reader = JspReader::new("/a.jsp", "  \n<jsp:body>");
        assert!(!reader.matches_optional_spaces_followed_by("<jsp:attribute"));
        assert_eq!(reader.skip_spaces(), 3);
        assert!(reader.matches_optional_spaces_followed_by("<jsp:body"));
    }
}
