//! Named step sequences
//!
//! A sequence is a reusable list of steps invoked with `run`. Sequences are
//! expanded in place before a scenario starts, so an unknown name or a
//! sequence that runs itself fails the scenario before any step executes.

use std::collections::BTreeMap;

use tracing::debug;

use crate::common::{Error, Result};

use super::config::{Expectation, TestStep};

/// Fills the mandatory fields with valid data, submits, and expects the
/// success banner
pub const FILL_MANDATORY_FIELDS_AND_SUBMIT: &str = "fill_mandatory_fields_and_submit";

#[derive(Debug, Clone)]
pub struct SequenceRegistry {
    sequences: BTreeMap<String, Vec<TestStep>>,
}

impl Default for SequenceRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SequenceRegistry {
    pub fn empty() -> Self {
        Self {
            sequences: BTreeMap::new(),
        }
    }

    /// Registry with the built-in sequences
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.define(FILL_MANDATORY_FIELDS_AND_SUBMIT, fill_mandatory_fields_and_submit());
        registry
    }

    /// Add or replace a sequence
    pub fn define(&mut self, name: &str, steps: Vec<TestStep>) {
        if self.sequences.insert(name.to_string(), steps).is_some() {
            debug!(sequence = name, "sequence overridden");
        }
    }

    pub fn get(&self, name: &str) -> Option<&[TestStep]> {
        self.sequences.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sequences.keys().map(String::as_str)
    }

    /// Replace every `run` step, including those inside `each`, with the
    /// steps of the named sequence
    pub fn expand(&self, steps: &[TestStep]) -> Result<Vec<TestStep>> {
        let mut out = Vec::with_capacity(steps.len());
        self.expand_into(steps, &mut Vec::new(), &mut out)?;
        Ok(out)
    }

    fn expand_into(&self, steps: &[TestStep], stack: &mut Vec<String>, out: &mut Vec<TestStep>) -> Result<()> {
        for step in steps {
            match step {
                TestStep::Run { sequence } => {
                    if stack.iter().any(|s| s == sequence) {
                        stack.push(sequence.clone());
                        return Err(Error::Config(format!(
                            "Sequence cycle: {}",
                            stack.join(" -> ")
                        )));
                    }
                    let body = self.get(sequence).ok_or_else(|| {
                        let known: Vec<&str> = self.names().collect();
                        Error::Config(format!(
                            "Unknown sequence '{}'. Known: {:?}",
                            sequence, known
                        ))
                    })?;
                    stack.push(sequence.clone());
                    self.expand_into(body, stack, out)?;
                    stack.pop();
                }
                TestStep::Each { locator, steps } => {
                    let mut inner = Vec::with_capacity(steps.len());
                    self.expand_into(steps, stack, &mut inner)?;
                    out.push(TestStep::Each {
                        locator: locator.clone(),
                        steps: inner,
                    });
                }
                other => out.push(other.clone()),
            }
        }
        Ok(())
    }
}

fn fill_mandatory_fields_and_submit() -> Vec<TestStep> {
    let typed = |locator: &str, text: &str| TestStep::Type {
        locator: locator.to_string(),
        text: text.to_string(),
        delay_ms: None,
    };
    vec![
        typed("#firstName", "Mike"),
        typed("#lastName", "Baguncinha"),
        typed("#email", "mikebaguncinha@email.com"),
        typed("#open-text-area", "Teste"),
        TestStep::Click {
            locator: "button[type=submit]".to_string(),
        },
        TestStep::Assert {
            locator: ".success".to_string(),
            expect: Expectation {
                visible: Some(true),
                ..Default::default()
            },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(name: &str) -> TestStep {
        TestStep::Run {
            sequence: name.to_string(),
        }
    }

    #[test]
    fn test_builtin_expands_in_place() {
        let registry = SequenceRegistry::builtin();
        let steps = vec![TestStep::InstallClock, run(FILL_MANDATORY_FIELDS_AND_SUBMIT), TestStep::Tick { ms: 3000 }];
        let expanded = registry.expand(&steps).unwrap();
        assert_eq!(expanded.len(), 8);
        assert_eq!(expanded[0], TestStep::InstallClock);
        assert!(matches!(&expanded[5], TestStep::Click { .. }));
        assert_eq!(expanded[7], TestStep::Tick { ms: 3000 });
    }

    #[test]
    fn test_nested_and_inside_each() {
        let mut registry = SequenceRegistry::empty();
        registry.define("inner", vec![TestStep::InstallClock]);
        registry.define("outer", vec![run("inner"), run("inner")]);
        let steps = vec![TestStep::Each {
            locator: "input".to_string(),
            steps: vec![run("outer")],
        }];
        let expanded = registry.expand(&steps).unwrap();
        let TestStep::Each { steps, .. } = &expanded[0] else {
            panic!("expected each");
        };
        assert_eq!(steps, &vec![TestStep::InstallClock, TestStep::InstallClock]);
    }

    #[test]
    fn test_unknown_sequence() {
        let err = SequenceRegistry::builtin().expand(&[run("nope")]).unwrap_err();
        assert!(err.to_string().contains("Unknown sequence 'nope'"));
    }

    #[test]
    fn test_cycle_detected() {
        let mut registry = SequenceRegistry::empty();
        registry.define("a", vec![run("b")]);
        registry.define("b", vec![run("a")]);
        let err = registry.expand(&[run("a")]).unwrap_err();
        assert!(err.to_string().contains("a -> b -> a"), "{err}");
    }

    #[test]
    fn test_suite_sequence_overrides_builtin() {
        let mut registry = SequenceRegistry::builtin();
        registry.define(FILL_MANDATORY_FIELDS_AND_SUBMIT, vec![TestStep::InstallClock]);
        let expanded = registry.expand(&[run(FILL_MANDATORY_FIELDS_AND_SUBMIT)]).unwrap();
        assert_eq!(expanded, vec![TestStep::InstallClock]);
    }
}
