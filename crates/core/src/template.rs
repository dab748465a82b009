use crate::error::RenameError;
use crate::index::IndexSequence;
use regex::Captures;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePart {
    Literal(String),
    Token(Token),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `\N` or `\(N)`
    Group(usize),
    /// `\(index)`
    Index,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    parts: Vec<TemplatePart>,
}

impl Template {
    pub fn max_group(&self) -> Option<usize> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                TemplatePart::Token(Token::Group(n)) => Some(*n),
                _ => None,
            })
            .max()
    }

    /// `group_count` includes the implicit group 0.
    pub fn check_groups(&self, group_count: usize) -> Result<(), RenameError> {
        match self.max_group() {
            Some(group) if group >= group_count => Err(RenameError::GroupOutOfRange {
                group,
                available: group_count.saturating_sub(1),
            }),
            _ => Ok(()),
        }
    }

    pub fn render(
        &self,
        captures: &Captures<'_>,
        index: &IndexSequence,
        position: usize,
        total: usize,
    ) -> Result<String, RenameError> {
        let mut output = String::new();
        for part in &self.parts {
            match part {
                TemplatePart::Literal(s) => output.push_str(s),
                TemplatePart::Token(Token::Group(n)) => {
                    if *n >= captures.len() {
                        return Err(RenameError::GroupOutOfRange {
                            group: *n,
                            available: captures.len().saturating_sub(1),
                        });
                    }
                    // groups that did not take part in the match render empty
                    if let Some(m) = captures.get(*n) {
                        output.push_str(m.as_str());
                    }
                }
                TemplatePart::Token(Token::Index) => {
                    let source = captures.get(0).map(|m| m.as_str()).unwrap_or_default();
                    let rendered = index.render(position, total).ok_or_else(|| {
                        RenameError::NegativeIndex {
                            source_name: source.to_string(),
                            value: index.value(position),
                        }
                    })?;
                    output.push_str(&rendered);
                }
            }
        }
        Ok(output)
    }
}

pub fn parse_template(input: &str) -> Result<Template, RenameError> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut rest = input;

    while let Some(pos) = rest.find('\\') {
        literal.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some((token, consumed)) = parse_reference(after)? {
            if !literal.is_empty() {
                parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
            }
            parts.push(TemplatePart::Token(token));
            rest = &after[consumed..];
        } else {
            literal.push('\\');
            rest = after;
        }
    }
    literal.push_str(rest);

    if !literal.is_empty() {
        parts.push(TemplatePart::Literal(literal));
    }

    Ok(Template { parts })
}

/// Parses what follows a backslash. Returns the token and the number of
/// bytes it spans, or `None` when the backslash is literal text.
fn parse_reference(after: &str) -> Result<Option<(Token, usize)>, RenameError> {
    let digits = after.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 {
        return Ok(Some((Token::Group(parse_group(&after[..digits])), digits)));
    }

    let Some(inner) = after.strip_prefix('(') else {
        return Ok(None);
    };
    let Some(close) = inner.find(')') else {
        return Ok(None);
    };
    if close == 0 {
        return Ok(None);
    }

    let reference = &inner[..close];
    let token = if reference.bytes().all(|b| b.is_ascii_digit()) {
        Token::Group(parse_group(reference))
    } else if reference == "index" {
        Token::Index
    } else {
        return Err(RenameError::UnknownReference(reference.to_string()));
    };
    Ok(Some((token, close + 2)))
}

// absurdly long numbers saturate and are rejected by the group count check
fn parse_group(digits: &str) -> usize {
    digits.parse().unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexDigits;
    use regex::Regex;

    fn render(template: &str, pattern: &str, name: &str) -> Result<String, RenameError> {
        let parsed = parse_template(template)?;
        let regex = Regex::new(pattern).expect("valid regex");
        let captures = regex.captures(name).expect("must match");
        parsed.render(&captures, &IndexSequence::default(), 0, 1)
    }

    #[test]
    fn parse_template_ok() {
        let parsed = parse_template(r"Brand\1_\(2)_\(index)").expect("must parse");
        assert_eq!(
            parsed.parts,
            &[
                TemplatePart::Literal("Brand".to_string()),
                TemplatePart::Token(Token::Group(1)),
                TemplatePart::Literal("_".to_string()),
                TemplatePart::Token(Token::Group(2)),
                TemplatePart::Literal("_".to_string()),
                TemplatePart::Token(Token::Index),
            ]
        );
        assert_eq!(parsed.max_group(), Some(2));
    }

    #[test]
    fn parse_template_invalid_unknown() {
        let err = parse_template(r"\(invalid)").expect_err("must fail");
        assert!(matches!(err, RenameError::UnknownReference(ref r) if r == "invalid"));
    }

    #[test]
    fn index_reference_is_case_sensitive() {
        let err = parse_template(r"\(Index)").expect_err("must fail");
        assert!(matches!(err, RenameError::UnknownReference(_)));
    }

    #[test]
    fn stray_backslashes_stay_literal() {
        let parsed = parse_template(r"a\b\()c\(").expect("must parse");
        assert_eq!(
            parsed.parts,
            &[TemplatePart::Literal(r"a\b\()c\(".to_string())]
        );
    }

    #[test]
    fn multi_digit_group_numbers() {
        let pattern = r"^(a)(b)(c)(d)(e)(f)(g)(h)(i)(j)(k)$";
        assert_eq!(
            render(r"\11-\1", pattern, "abcdefghijk").expect("render"),
            "k-a"
        );
    }

    #[test]
    fn render_substitutes_both_reference_forms() {
        let rendered = render(r"Brand\1q-\(1)", r"^CaSe(\d)q$", "CaSe2q").expect("render");
        assert_eq!(rendered, "Brand2q-2");
    }

    #[test]
    fn render_group_zero_is_whole_match() {
        let rendered = render(r"\0.bak", r"^(.*)$", "notes").expect("render");
        assert_eq!(rendered, "notes.bak");
    }

    #[test]
    fn captured_text_is_not_rescanned() {
        let rendered = render(r"x\1", r"^(.*)$", r"\(index)").expect("render");
        assert_eq!(rendered, r"x\(index)");
    }

    #[test]
    fn unmatched_optional_group_renders_empty() {
        let rendered = render(r"[\2]", r"^(a)(b)?$", "a").expect("render");
        assert_eq!(rendered, "[]");
    }

    #[test]
    fn group_out_of_range_is_rejected() {
        let parsed = parse_template(r"\3").expect("must parse");
        let err = parsed.check_groups(2).expect_err("must fail");
        assert!(matches!(
            err,
            RenameError::GroupOutOfRange {
                group: 3,
                available: 1
            }
        ));
    }

    #[test]
    fn render_index_with_padding() {
        let parsed = parse_template(r"C\(index)").expect("must parse");
        let regex = Regex::new(r"^CaSe.*$").expect("valid regex");
        let captures = regex.captures("CaSe1q").expect("must match");
        let seq = IndexSequence {
            first: 1,
            step: 1,
            digits: IndexDigits::Fixed(3),
            pad: '_',
        };
        assert_eq!(parsed.render(&captures, &seq, 4, 60).expect("render"), "C__5");
    }

    #[test]
    fn render_rejects_negative_index() {
        let parsed = parse_template(r"\(index)").expect("must parse");
        let regex = Regex::new(r"^.*$").expect("valid regex");
        let captures = regex.captures("file").expect("must match");
        let seq = IndexSequence {
            first: 0,
            step: -1,
            digits: IndexDigits::Auto,
            pad: '0',
        };
        let err = parsed
            .render(&captures, &seq, 1, 2)
            .expect_err("negative index");
        assert!(matches!(
            err,
            RenameError::NegativeIndex { value: -1, .. }
        ));
    }
}
