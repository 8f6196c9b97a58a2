//! Element predicates checked by `assert` steps

use crate::common::{Error, Result};
use crate::driver::ElementState;

use super::config::Expectation;

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Visible(bool),
    Checked(bool),
    Value(String),
    Text(String),
    Contains(String),
    Attr {
        name: String,
        value: Option<String>,
        present: bool,
    },
    Length(usize),
    FileName(String),
}

impl Predicate {
    /// Predicates in the order they are checked
    pub fn from_expectation(expect: &Expectation) -> Vec<Predicate> {
        let mut out = Vec::new();
        if let Some(length) = expect.length {
            out.push(Predicate::Length(length));
        }
        if let Some(visible) = expect.visible {
            out.push(Predicate::Visible(visible));
        }
        if let Some(checked) = expect.checked {
            out.push(Predicate::Checked(checked));
        }
        if let Some(value) = &expect.value {
            out.push(Predicate::Value(value.clone()));
        }
        if let Some(text) = &expect.text {
            out.push(Predicate::Text(text.clone()));
        }
        if let Some(contains) = &expect.contains {
            out.push(Predicate::Contains(contains.clone()));
        }
        if let Some(attr) = &expect.attr {
            out.push(Predicate::Attr {
                name: attr.name.to_ascii_lowercase(),
                value: attr.value.clone(),
                present: attr.present,
            });
        }
        if let Some(name) = &expect.file_name {
            out.push(Predicate::FileName(name.clone()));
        }
        out
    }

    /// Check against every matched element
    ///
    /// `Length` looks at the match count and accepts zero matches; every
    /// other predicate needs at least one element.
    pub fn check(&self, locator: &str, states: &[ElementState]) -> Result<()> {
        if let Predicate::Length(expected) = self {
            if states.len() != *expected {
                return Err(Error::assertion(
                    locator,
                    format!("length {}", expected),
                    format!("length {}", states.len()),
                ));
            }
            return Ok(());
        }

        if states.is_empty() {
            return Err(Error::element_not_found(locator, "at least 1", 0));
        }
        for state in states {
            self.check_one(locator, state)?;
        }
        Ok(())
    }

    fn check_one(&self, locator: &str, state: &ElementState) -> Result<()> {
        let fail = |expected: String, actual: String| Err(Error::assertion(locator, expected, actual));

        match self {
            Predicate::Length(_) => Ok(()),
            Predicate::Visible(expected) => {
                if state.visible != *expected {
                    return fail(visibility(*expected), visibility(state.visible));
                }
                Ok(())
            }
            Predicate::Checked(expected) => match state.checked {
                Some(actual) if actual == *expected => Ok(()),
                Some(actual) => fail(checkedness(*expected), checkedness(actual)),
                None => fail(checkedness(*expected), format!("<{}> is not checkable", state.tag)),
            },
            Predicate::Value(expected) => match &state.value {
                Some(actual) if actual == expected => Ok(()),
                Some(actual) => fail(format!("value '{}'", expected), format!("value '{}'", actual)),
                None => fail(format!("value '{}'", expected), format!("<{}> has no value", state.tag)),
            },
            Predicate::Text(expected) => {
                let actual = state.text.trim();
                if actual != expected.trim() {
                    return fail(format!("text '{}'", expected), format!("text '{}'", actual));
                }
                Ok(())
            }
            Predicate::Contains(expected) => {
                if !state.text.contains(expected.as_str()) {
                    return fail(
                        format!("text containing '{}'", expected),
                        format!("text '{}'", state.text.trim()),
                    );
                }
                Ok(())
            }
            Predicate::Attr {
                name,
                value,
                present,
            } => {
                // Attribute names are stored lowercased
                let actual = state.attributes.get(&name.to_ascii_lowercase());
                match (actual, value, present) {
                    (Some(_), _, false) => fail(
                        format!("no attribute '{}'", name),
                        format!("attribute '{}' present", name),
                    ),
                    (None, _, false) => Ok(()),
                    (None, _, true) => fail(
                        format!("attribute '{}'", name),
                        format!("no attribute '{}'", name),
                    ),
                    (Some(actual), Some(expected), true) if actual != expected => fail(
                        format!("{}='{}'", name, expected),
                        format!("{}='{}'", name, actual),
                    ),
                    (Some(_), _, true) => Ok(()),
                }
            }
            Predicate::FileName(expected) => match state.files.first() {
                Some(actual) if actual == expected => Ok(()),
                Some(actual) => fail(format!("file '{}'", expected), format!("file '{}'", actual)),
                None => fail(format!("file '{}'", expected), "no file selected".to_string()),
            },
        }
    }
}

fn visibility(visible: bool) -> String {
    if visible { "visible" } else { "hidden" }.to_string()
}

fn checkedness(checked: bool) -> String {
    if checked { "checked" } else { "unchecked" }.to_string()
}
