//! Attribute lists of directives, actions and custom tags

use super::grammar::Parser;
use crate::errors::{messages, JspResult};
use crate::logging::codes::{directive, lexical, resolution, syntax};
use crate::nodes::{Attribute, Attributes};

impl<'p, 'c> Parser<'p, 'c> {
    /// `Attributes ::= (S Attribute)* S?`
    ///
    /// In directive mode a repeated `import` is merged and other repeats are
    /// accepted when the values agree, except `pageEncoding`.
    pub(super) fn parse_attributes(&mut self, directive_mode: bool) -> JspResult<Attributes> {
        let mut attrs = Attributes::new();
        self.reader.skip_spaces();
        let mut ws = 1;
        while let Some(attribute) = self.parse_attribute()? {
            if ws == 0 && self.options().strict_whitespace {
                return self.err.fail(
                    lexical::MISSING_WHITESPACE,
                    Some(&self.reader.mark()),
                    messages::attribute_no_whitespace(),
                );
            }
            self.add_attribute(&mut attrs, attribute, directive_mode)?;
            ws = self.reader.skip_spaces();
        }
        Ok(attrs)
    }

    fn add_attribute(
        &mut self,
        attrs: &mut Attributes,
        attribute: Attribute,
        directive_mode: bool,
    ) -> JspResult<()> {
        let Some(existing) = attrs.get_mut(&attribute.qname) else {
            attrs.push(attribute);
            return Ok(());
        };
        let code = if directive_mode {
            match attribute.qname.as_str() {
                "import" => {
                    existing.value = format!("{},{}", existing.value, attribute.value);
                    return Ok(());
                }
                "pageEncoding" => directive::DUPLICATE_DIRECTIVE_ATTRIBUTE,
                _ if existing.value == attribute.value => return Ok(()),
                _ => syntax::DUPLICATE_ATTRIBUTE,
            }
        } else {
            syntax::DUPLICATE_ATTRIBUTE
        };
        self.err.fail(
            code,
            Some(&self.reader.mark()),
            messages::duplicate_attribute_in_element(&attribute.qname),
        )
    }

    /// `Attribute ::= Name S? Eq S? Quote Value Quote`, where a value may
    /// also be a `<%= .. %>` expression
    fn parse_attribute(&mut self) -> JspResult<Option<Attribute>> {
        let Some(qname) = self.parse_name() else {
            return Ok(None);
        };

        let (uri, local_name) = match qname.split_once(':') {
            Some((prefix, local)) => match self.page_info.uri_for_prefix(prefix) {
                Some(uri) => (Some(uri.to_string()), local.to_string()),
                None => {
                    return self.err.fail(
                        resolution::UNBOUND_PREFIX,
                        Some(&self.reader.mark()),
                        messages::invalid_attribute_prefix(prefix),
                    )
                }
            },
            None => (None, qname.clone()),
        };

        self.reader.skip_spaces();
        if !self.reader.matches("=") {
            return self.err.fail(
                lexical::MISSING_EQUALS,
                Some(&self.reader.mark()),
                messages::missing_equal(),
            );
        }

        self.reader.skip_spaces();
        let quote = match self.reader.next_char() {
            Some(q @ ('"' | '\'')) => q,
            _ => {
                return self.err.fail(
                    lexical::MISSING_QUOTE,
                    Some(&self.reader.mark()),
                    messages::missing_quote(),
                )
            }
        };

        let scripting = self.reader.matches("<%=");
        let value = self.parse_attribute_value(quote, scripting)?;
        Ok(Some(Attribute {
            qname,
            local_name,
            uri,
            value,
        }))
    }

    /// `Name ::= (Letter | '_' | ':') (Letter | Digit | '.' | '_' | '-' | ':')*`
    fn parse_name(&mut self) -> Option<String> {
        let first = self.reader.peek_char()?;
        if !(first.is_alphabetic() || first == '_' || first == ':') {
            return None;
        }
        let mut name = String::new();
        while let Some(ch) = self.reader.peek_char() {
            if !(ch.is_alphanumeric() || matches!(ch, '.' | '_' | '-' | ':')) {
                break;
            }
            name.push(ch);
            self.reader.next_char();
        }
        Some(name)
    }

    fn parse_attribute_value(&mut self, quote: char, scripting: bool) -> JspResult<String> {
        let watch = if scripting {
            format!("%>{}", quote)
        } else {
            quote.to_string()
        };
        let start = self.reader.mark();
        let el_ignored = self.page_info.el_ignored || scripting;
        let Some(stop) = self.reader.skip_until_ignore_esc(&watch, el_ignored) else {
            return self.err.fail(
                lexical::UNTERMINATED_ATTRIBUTE,
                Some(&start),
                messages::unterminated_attribute(&watch),
            );
        };

        let raw = self.reader.get_text(&start, &stop);
        let Some(value) = unquote(
            &raw,
            quote,
            el_ignored,
            self.page_info.deferred_syntax_allowed_as_literal,
            self.options().strict_quote_escaping,
        ) else {
            return self.err.fail(
                lexical::MISSING_QUOTE,
                Some(&start),
                messages::missing_escaping(&raw, quote),
            );
        };

        if scripting {
            // Delimiters stay so later stages can reject expressions
            // where the attribute does not accept them
            Ok(format!("<%={}%>", value))
        } else {
            Ok(value)
        }
    }
}

/// Resolve the quoting escapes of a raw attribute value.
///
/// Expression spans are copied untouched. Outside them `\\`, `\"`, `\'`
/// and `\>` lose their backslash, `&apos;` and `&quot;` become quotes and
/// `<\%` / `%\>` become `<%` / `%>`. `\$` and `\#` are left for the
/// expression parser. Returns `None` when strict quoting is on and the
/// delimiting quote appears unescaped.
pub fn unquote(
    input: &str,
    quote: char,
    el_ignored: bool,
    deferred_as_literal: bool,
    strict_quotes: bool,
) -> Option<String> {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        let next = chars.get(i + 1).copied();
        let opens_el = !el_ignored
            && next == Some('{')
            && (ch == '$' || (ch == '#' && !deferred_as_literal))
            && !(i > 0 && chars[i - 1] == '\\');
        if opens_el {
            let end = el_span_end(&chars, i + 2);
            out.extend(&chars[i..end]);
            i = end;
            continue;
        }
        match ch {
            '\\' => match next {
                Some(escaped @ ('\\' | '"' | '\'' | '>')) => {
                    out.push(escaped);
                    i += 2;
                }
                _ => {
                    out.push('\\');
                    i += 1;
                }
            },
            '&' if chars[i..].starts_with(&['&', 'a', 'p', 'o', 's', ';']) => {
                out.push('\'');
                i += 6;
            }
            '&' if chars[i..].starts_with(&['&', 'q', 'u', 'o', 't', ';']) => {
                out.push('"');
                i += 6;
            }
            '<' if chars[i..].starts_with(&['<', '\\', '%']) => {
                out.push_str("<%");
                i += 3;
            }
            '%' if chars[i..].starts_with(&['%', '\\', '>']) => {
                out.push_str("%>");
                i += 3;
            }
            _ if ch == quote && strict_quotes => return None,
            _ => {
                out.push(ch);
                i += 1;
            }
        }
    }
    Some(out)
}

/// Index just past the `}` closing an expression whose body starts at `from`
fn el_span_end(chars: &[char], from: usize) -> usize {
    let mut quote: Option<char> = None;
    let mut nesting = 0usize;
    let mut i = from;
    while i < chars.len() {
        let ch = chars[i];
        match quote {
            Some(_) if ch == '\\' => i += 1,
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None => match ch {
                '"' | '\'' => quote = Some(ch),
                '{' => nesting += 1,
                '}' if nesting == 0 => return i + 1,
                '}' => nesting -= 1,
                _ => {}
            },
        }
        i += 1;
    }
    chars.len()
}
