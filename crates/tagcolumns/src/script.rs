//! Script evaluation boundary.
//!
//! Scripting engines plug in through [`ScriptEvaluator`]. The crate ships
//! [`PercentTemplate`], which only understands `%name%` substitution and is
//! enough for columns that concatenate tags.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::fields::normalize_field_key;
use crate::item::{Item, Metadata};

/// Errors reported by a script evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    /// The script text could not be parsed.
    #[error("syntax error at {position}: {message}")]
    Syntax { position: usize, message: String },

    /// The script parsed but failed while running.
    #[error("evaluation failed: {0}")]
    Evaluation(String),
}

/// Evaluation context for one item.
///
/// Variables come from the item's metadata; the item itself travels along
/// as the file hint for evaluators that need file-level information.
#[derive(Clone, Copy)]
pub struct ScriptContext<'a> {
    metadata: Option<&'a Metadata>,
    item: &'a dyn Item,
}

impl<'a> ScriptContext<'a> {
    /// Builds the context for an item.
    pub fn for_item(item: &'a dyn Item) -> Self {
        ScriptContext {
            metadata: item.metadata(),
            item,
        }
    }

    /// Returns the metadata variables are read from.
    pub fn metadata(&self) -> Option<&'a Metadata> {
        self.metadata
    }

    /// Returns the item being evaluated.
    pub fn item(&self) -> &'a dyn Item {
        self.item
    }

    /// Looks up a variable; `_name` and bare hidden names read `~name`.
    pub fn lookup(&self, name: &str) -> Option<String> {
        self.metadata?.get(&normalize_field_key(name))
    }

    /// Returns `true` if the variable is bound in the metadata.
    pub fn contains(&self, name: &str) -> bool {
        self.metadata
            .is_some_and(|metadata| metadata.contains(&normalize_field_key(name)))
    }
}

impl fmt::Debug for ScriptContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptContext")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// An external scripting engine.
pub trait ScriptEvaluator {
    /// Evaluates `script` against the context.
    fn evaluate(&self, script: &str, context: &ScriptContext<'_>) -> Result<String, ScriptError>;

    /// Checks the script for syntax errors without evaluating it.
    fn validate(&self, script: &str) -> Result<(), ScriptError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(String),
}

/// Minimal evaluator substituting `%name%` variables.
///
/// Unknown variables expand to `""`. A `%` without a closing partner, or a
/// variable name with characters outside `[A-Za-z0-9_~:]`, is a syntax
/// error. Parsed templates are kept per script text.
#[derive(Debug, Default)]
pub struct PercentTemplate {
    compiled: RefCell<HashMap<String, Rc<Vec<Segment>>>>,
}

impl PercentTemplate {
    /// Creates an evaluator with an empty template cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn compile(&self, script: &str) -> Result<Rc<Vec<Segment>>, ScriptError> {
        if let Some(segments) = self.compiled.borrow().get(script) {
            return Ok(Rc::clone(segments));
        }
        let segments = Rc::new(parse_template(script)?);
        self.compiled
            .borrow_mut()
            .insert(script.to_string(), Rc::clone(&segments));
        Ok(segments)
    }
}

impl ScriptEvaluator for PercentTemplate {
    fn evaluate(&self, script: &str, context: &ScriptContext<'_>) -> Result<String, ScriptError> {
        let segments = self.compile(script)?;
        let mut out = String::new();
        for segment in segments.iter() {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Variable(name) => {
                    if let Some(value) = context.lookup(name) {
                        out.push_str(&value);
                    }
                }
            }
        }
        Ok(out)
    }

    fn validate(&self, script: &str) -> Result<(), ScriptError> {
        parse_template(script).map(|_| ())
    }
}

fn is_variable_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '~' | ':')
}

fn parse_template(script: &str) -> Result<Vec<Segment>, ScriptError> {
    let mut segments = Vec::new();
    let mut rest = script;
    let mut offset = 0;

    while let Some(open) = rest.find('%') {
        if open > 0 {
            segments.push(Segment::Literal(rest[..open].to_string()));
        }
        let after = &rest[open + 1..];
        let close = after.find('%').ok_or_else(|| ScriptError::Syntax {
            position: offset + open,
            message: "unterminated variable".to_string(),
        })?;
        let name = &after[..close];
        if name.is_empty() {
            return Err(ScriptError::Syntax {
                position: offset + open,
                message: "empty variable name".to_string(),
            });
        }
        if let Some(bad) = name.chars().find(|c| !is_variable_char(*c)) {
            return Err(ScriptError::Syntax {
                position: offset + open,
                message: format!("invalid character {bad:?} in variable name"),
            });
        }
        segments.push(Segment::Variable(name.to_string()));

        let consumed = open + 1 + close + 1;
        offset += consumed;
        rest = &rest[consumed..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Literal(rest.to_string()));
    }
    Ok(segments)
}
