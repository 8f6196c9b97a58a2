//! Element locators
//!
//! A small CSS-style selector language:
//!
//! ```text
//! locator   := compound (WS compound)* position?
//! compound  := (tag | '*')? ('#' id | '.' class | '[' attr ('=' value)? ']' | ':contains(' text ')')*
//! position  := ':first' | ':last' | ':eq(' n ')'
//! ```
//!
//! Whitespace is the descendant combinator. `:contains` picks the deepest
//! elements whose text includes the argument, so `:contains("Enviar")`
//! resolves to the button rather than every ancestor of it.

use std::fmt;

use super::{Document, NodeId};
use crate::common::{Error, Result};

/// Positional filter applied to the ordered match set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    First,
    Last,
    Eq(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
    contains: Option<String>,
}

/// A parsed locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    source: String,
    compounds: Vec<Compound>,
    position: Option<Position>,
}

impl Locator {
    pub fn parse(source: &str) -> Result<Self> {
        let mut parser = Parser {
            source,
            chars: source.chars().collect(),
            pos: 0,
        };
        let mut compounds = Vec::new();
        let mut position = None;

        parser.skip_ws();
        while !parser.eof() {
            if position.is_some() {
                return Err(parser.error("positional pseudo-class must end the locator"));
            }
            let (compound, pos) = parser.compound()?;
            compounds.push(compound);
            position = pos;
            parser.skip_ws();
        }

        if compounds.is_empty() {
            return Err(Error::invalid_locator(source, "empty locator"));
        }

        Ok(Self {
            source: source.to_string(),
            compounds,
            position,
        })
    }

    /// Matching elements in document order, positional filter applied
    pub fn matches(&self, doc: &Document) -> Vec<NodeId> {
        let found: Vec<NodeId> = doc
            .elements()
            .into_iter()
            .filter(|id| self.matches_element(doc, *id))
            .collect();

        match self.position {
            None => found,
            Some(Position::First) => found.into_iter().take(1).collect(),
            Some(Position::Last) => found.into_iter().last().into_iter().collect(),
            Some(Position::Eq(n)) => found.into_iter().nth(n).into_iter().collect(),
        }
    }

    fn matches_element(&self, doc: &Document, id: NodeId) -> bool {
        let Some((last, ancestors)) = self.compounds.split_last() else {
            return false;
        };
        if !last.matches(doc, id) {
            return false;
        }

        // Descendant-only chains match greedily from the right.
        let mut current = doc.parent(id);
        for compound in ancestors.iter().rev() {
            loop {
                let Some(node) = current else {
                    return false;
                };
                current = doc.parent(node);
                if compound.matches(doc, node) {
                    break;
                }
            }
        }
        true
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Compound {
    fn is_empty(&self) -> bool {
        *self == Compound::default()
    }

    fn matches(&self, doc: &Document, id: NodeId) -> bool {
        let Some(element) = doc.element(id) else {
            return false;
        };
        if let Some(tag) = &self.tag {
            if tag != "*" && !element.is(tag) {
                return false;
            }
        }
        if let Some(expected) = &self.id {
            if element.attr("id") != Some(expected.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| element.has_class(c)) {
            return false;
        }
        for (name, value) in &self.attrs {
            match (element.attr(name), value) {
                (None, _) => return false,
                (Some(actual), Some(expected)) if actual != expected => return false,
                _ => {}
            }
        }
        if let Some(text) = &self.contains {
            if !doc.text_content(id).contains(text.as_str()) {
                return false;
            }
            let deeper = doc
                .element_children(id)
                .into_iter()
                .any(|child| doc.text_content(child).contains(text.as_str()));
            if deeper {
                return false;
            }
        }
        true
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl Parser<'_> {
    fn eof(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn skip_ws(&mut self) {
        while self.peek().map(char::is_whitespace).unwrap_or(false) {
            self.pos += 1;
        }
    }

    fn error(&self, reason: &str) -> Error {
        Error::invalid_locator(self.source, format!("{reason} (at offset {})", self.pos))
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        match self.bump() {
            Some(ch) if ch == expected => Ok(()),
            _ => Err(self.error(&format!("expected '{expected}'"))),
        }
    }

    fn ident(&mut self) -> Result<String> {
        let start = self.pos;
        while self
            .peek()
            .map(|c| c.is_alphanumeric() || c == '-' || c == '_')
            .unwrap_or(false)
        {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected identifier"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    /// A quoted string, or raw text up to `terminator`
    fn argument(&mut self, terminator: char) -> Result<String> {
        self.skip_ws();
        if let Some(quote @ ('"' | '\'')) = self.peek() {
            self.pos += 1;
            let start = self.pos;
            while self.peek().map(|c| c != quote).unwrap_or(false) {
                self.pos += 1;
            }
            let value: String = self.chars[start..self.pos].iter().collect();
            self.expect(quote)?;
            self.skip_ws();
            return Ok(value);
        }
        let start = self.pos;
        while self.peek().map(|c| c != terminator).unwrap_or(false) {
            self.pos += 1;
        }
        Ok(self.chars[start..self.pos]
            .iter()
            .collect::<String>()
            .trim()
            .to_string())
    }

    fn compound(&mut self) -> Result<(Compound, Option<Position>)> {
        let mut compound = Compound::default();
        let mut position = None;

        match self.peek() {
            Some('*') => {
                self.pos += 1;
                compound.tag = Some("*".to_string());
            }
            Some(c) if c.is_alphabetic() => compound.tag = Some(self.ident()?.to_ascii_lowercase()),
            _ => {}
        }

        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                break;
            }
            if position.is_some() {
                return Err(self.error("positional pseudo-class must end the locator"));
            }
            self.pos += 1;
            match ch {
                '#' => compound.id = Some(self.ident()?),
                '.' => compound.classes.push(self.ident()?),
                '[' => {
                    self.skip_ws();
                    let name = self.ident()?.to_ascii_lowercase();
                    self.skip_ws();
                    let value = if self.peek() == Some('=') {
                        self.pos += 1;
                        Some(self.argument(']')?)
                    } else {
                        None
                    };
                    self.expect(']')?;
                    compound.attrs.push((name, value));
                }
                ':' => match self.ident()?.as_str() {
                    "contains" => {
                        self.expect('(')?;
                        compound.contains = Some(self.argument(')')?);
                        self.expect(')')?;
                    }
                    "eq" => {
                        self.expect('(')?;
                        let raw = self.argument(')')?;
                        let n = raw
                            .parse::<usize>()
                            .map_err(|_| self.error(&format!("invalid :eq index '{raw}'")))?;
                        self.expect(')')?;
                        position = Some(Position::Eq(n));
                    }
                    "first" => position = Some(Position::First),
                    "last" => position = Some(Position::Last),
                    other => return Err(self.error(&format!("unsupported pseudo-class ':{other}'"))),
                },
                other => return Err(self.error(&format!("unexpected character '{other}'"))),
            }
        }

        if compound.is_empty() && position.is_none() {
            return Err(self.error("empty selector"));
        }
        Ok((compound, position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Document {
        let mut doc = Document::new("t");
        let body = doc.body();
        let form = doc.append_element(body, "form", &[]);
        for value in ["ajuda", "elogio", "feedback"] {
            let label = doc.append_element(form, "label", &[]);
            doc.append_element(label, "input", &[("type", "radio"), ("name", "atendimento-tat"), ("value", value)]);
        }
        doc.append_element(form, "input", &[("type", "checkbox"), ("id", "email-checkbox")]);
        doc.append_element(form, "input", &[("type", "checkbox"), ("id", "phone-checkbox")]);
        let button = doc.append_element(form, "button", &[("type", "submit")]);
        let strong = doc.append_element(button, "strong", &[]);
        doc.append_text(strong, "Enviar");
        let privacy = doc.append_element(body, "p", &[("id", "privacy")]);
        let link = doc.append_element(privacy, "a", &[("href", "privacy.html"), ("target", "_blank")]);
        doc.append_text(link, "Política de Privacidade");
        doc
    }

    fn count(doc: &Document, locator: &str) -> usize {
        Locator::parse(locator).unwrap().matches(doc).len()
    }

    #[test]
    fn test_parse_compounds() {
        let loc = Locator::parse(r#"input[type="file"]#file-upload"#).unwrap();
        assert_eq!(loc.compounds.len(), 1);
        assert_eq!(loc.compounds[0].tag.as_deref(), Some("input"));
        assert_eq!(loc.compounds[0].id.as_deref(), Some("file-upload"));
        assert_eq!(
            loc.compounds[0].attrs,
            vec![("type".to_string(), Some("file".to_string()))]
        );
    }

    #[test]
    fn test_attribute_and_descendant_matching() {
        let doc = page();
        assert_eq!(count(&doc, r#"input[type="radio"]"#), 3);
        assert_eq!(count(&doc, "input[type=radio][value='feedback']"), 1);
        assert_eq!(count(&doc, "#privacy a"), 1);
        assert_eq!(count(&doc, "form a"), 0);
        assert_eq!(count(&doc, "input[type=checkbox]"), 2);
    }

    #[test]
    fn test_positional_pseudo_classes() {
        let doc = page();
        let last = Locator::parse("input[type=checkbox]:last").unwrap().matches(&doc);
        let by_id = Locator::parse("#phone-checkbox").unwrap().matches(&doc);
        assert_eq!(last, by_id);
        assert_eq!(count(&doc, "input[type=radio]:eq(2)"), 1);
        assert_eq!(count(&doc, "input[type=radio]:eq(3)"), 0);
        assert_eq!(count(&doc, "input:first"), 1);
    }

    #[test]
    fn test_contains_picks_deepest_element() {
        let doc = page();
        assert_eq!(count(&doc, r#"strong:contains("Enviar")"#), 1);
        // the text lives in a <strong> child, so the button itself is not the deepest match
        assert_eq!(count(&doc, "button:contains(Enviar)"), 0);
        assert_eq!(count(&doc, ":contains('Política de Privacidade')"), 1);
    }

    #[test]
    fn test_invalid_locators_are_rejected() {
        for bad in ["", "   ", "#", "input[type", ":hover", "input:first .x", "a:eq(x)", "a!"] {
            let err = Locator::parse(bad).unwrap_err();
            assert!(matches!(err, Error::InvalidLocator { .. }), "{bad}: {err}");
        }
    }
}
