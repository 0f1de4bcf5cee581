//! Value resolution chain used by script columns.
//!
//! Links are tried in order; a link that does not apply, fails, or produces
//! an empty value hands the request to the next one:
//!
//! 1. [`ObjectColumnResolver`]: `item.column(var)` for a bare `%var%` script.
//! 2. [`ContextVariableResolver`]: the variable from the evaluation context.
//! 3. [`ScriptEvaluatorResolver`]: full script evaluation (always applies).
//!
//! Cheap exact lookups come first so that plain variable columns rarely pay
//! for the evaluator.

use std::fmt;
use std::rc::Rc;

use log::debug;
use thiserror::Error;

use crate::item::{Item, LookupError};
use crate::script::{ScriptContext, ScriptError, ScriptEvaluator};

/// Errors a resolver link may report. The chain logs them and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Script(#[from] ScriptError),
}

/// Everything a resolver link gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct ResolveRequest<'a> {
    /// The row being evaluated.
    pub item: &'a dyn Item,
    /// Normalized variable name when the script is a bare `%var%`.
    pub simple_var: Option<&'a str>,
    /// Full script text.
    pub script: &'a str,
    /// Evaluation context; carries the item as file hint.
    pub context: &'a ScriptContext<'a>,
}

/// One link of the resolution chain.
pub trait ValueResolver {
    /// Returns `true` if this link applies to the request.
    fn can_resolve(&self, request: &ResolveRequest<'_>) -> bool;

    /// Computes the value for the request.
    fn resolve(&self, request: &ResolveRequest<'_>) -> Result<String, ResolveError>;

    /// Short name used in log messages.
    fn name(&self) -> &'static str;
}

/// Reads a bare variable through [`Item::column`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjectColumnResolver;

impl ValueResolver for ObjectColumnResolver {
    fn can_resolve(&self, request: &ResolveRequest<'_>) -> bool {
        request.simple_var.is_some()
    }

    fn resolve(&self, request: &ResolveRequest<'_>) -> Result<String, ResolveError> {
        match request.simple_var {
            Some(var) => Ok(request.item.column(var)?),
            None => Ok(String::new()),
        }
    }

    fn name(&self) -> &'static str {
        "object-column"
    }
}

/// Reads a bare variable from the evaluation context.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContextVariableResolver;

impl ValueResolver for ContextVariableResolver {
    fn can_resolve(&self, request: &ResolveRequest<'_>) -> bool {
        request.simple_var.is_some() && request.context.metadata().is_some()
    }

    fn resolve(&self, request: &ResolveRequest<'_>) -> Result<String, ResolveError> {
        Ok(request
            .simple_var
            .and_then(|var| request.context.lookup(var))
            .unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "context-variable"
    }
}

/// Evaluates the full script with a shared evaluator.
pub struct ScriptEvaluatorResolver {
    evaluator: Rc<dyn ScriptEvaluator>,
}

impl ScriptEvaluatorResolver {
    pub fn new(evaluator: Rc<dyn ScriptEvaluator>) -> Self {
        ScriptEvaluatorResolver { evaluator }
    }
}

impl fmt::Debug for ScriptEvaluatorResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptEvaluatorResolver").finish_non_exhaustive()
    }
}

impl ValueResolver for ScriptEvaluatorResolver {
    fn can_resolve(&self, _request: &ResolveRequest<'_>) -> bool {
        true
    }

    fn resolve(&self, request: &ResolveRequest<'_>) -> Result<String, ResolveError> {
        Ok(self.evaluator.evaluate(request.script, request.context)?)
    }

    fn name(&self) -> &'static str {
        "script-evaluator"
    }
}

/// Ordered list of resolver links.
pub struct ValueResolverChain {
    links: Vec<Box<dyn ValueResolver>>,
}

impl ValueResolverChain {
    /// Builds the standard object, context, evaluator chain.
    pub fn new(evaluator: Rc<dyn ScriptEvaluator>) -> Self {
        ValueResolverChain {
            links: vec![
                Box::new(ObjectColumnResolver),
                Box::new(ContextVariableResolver),
                Box::new(ScriptEvaluatorResolver::new(evaluator)),
            ],
        }
    }

    /// Builds a chain from explicit links.
    pub fn with_links(links: Vec<Box<dyn ValueResolver>>) -> Self {
        ValueResolverChain { links }
    }

    /// Returns the first non-empty value any applicable link produces,
    /// or `""` when none does.
    pub fn resolve_value(&self, request: &ResolveRequest<'_>) -> String {
        for link in &self.links {
            if !link.can_resolve(request) {
                continue;
            }
            match link.resolve(request) {
                Ok(value) if !value.is_empty() => return value,
                Ok(_) => {}
                Err(err) => debug!(
                    "resolver {} failed for {:?}: {}",
                    link.name(),
                    request.script,
                    err
                ),
            }
        }
        String::new()
    }
}

impl fmt::Debug for ValueResolverChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.links.iter().map(|link| link.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Metadata;
    use crate::script::PercentTemplate;
    use std::cell::Cell;

    struct Track {
        columns: Vec<(&'static str, &'static str)>,
        metadata: Option<Metadata>,
    }

    impl Item for Track {
        fn column(&self, key: &str) -> Result<String, LookupError> {
            self.columns
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
                .ok_or_else(|| LookupError::UnknownKey(key.to_string()))
        }

        fn metadata(&self) -> Option<&Metadata> {
            self.metadata.as_ref()
        }
    }

    struct CountingEvaluator {
        calls: Cell<usize>,
        result: Result<String, ScriptError>,
    }

    impl ScriptEvaluator for CountingEvaluator {
        fn evaluate(&self, _: &str, _: &ScriptContext<'_>) -> Result<String, ScriptError> {
            self.calls.set(self.calls.get() + 1);
            self.result.clone()
        }

        fn validate(&self, _: &str) -> Result<(), ScriptError> {
            Ok(())
        }
    }

    fn resolve(chain: &ValueResolverChain, item: &dyn Item, var: Option<&str>, script: &str) -> String {
        let context = ScriptContext::for_item(item);
        chain.resolve_value(&ResolveRequest {
            item,
            simple_var: var,
            script,
            context: &context,
        })
    }

    #[test]
    fn object_column_wins_for_simple_variables() {
        let evaluator = Rc::new(CountingEvaluator {
            calls: Cell::new(0),
            result: Ok("from script".into()),
        });
        let chain = ValueResolverChain::new(evaluator.clone());
        let item = Track {
            columns: vec![("artist", "from column")],
            metadata: Some([("artist", "from metadata")].into_iter().collect()),
        };
        assert_eq!(resolve(&chain, &item, Some("artist"), "%artist%"), "from column");
        assert_eq!(evaluator.calls.get(), 0);
    }

    #[test]
    fn context_is_used_when_column_lookup_fails() {
        let chain = ValueResolverChain::new(Rc::new(PercentTemplate::new()));
        let item = Track {
            columns: vec![],
            metadata: Some([("artist", "from metadata")].into_iter().collect()),
        };
        assert_eq!(resolve(&chain, &item, Some("artist"), "%artist%"), "from metadata");
    }

    #[test]
    fn evaluator_handles_full_scripts() {
        let evaluator = Rc::new(CountingEvaluator {
            calls: Cell::new(0),
            result: Ok("evaluated".into()),
        });
        let chain = ValueResolverChain::new(evaluator.clone());
        let item = Track {
            columns: vec![("artist", "A")],
            metadata: None,
        };
        assert_eq!(resolve(&chain, &item, None, "$upper(%artist%)"), "evaluated");
        assert_eq!(evaluator.calls.get(), 1);
    }

    #[test]
    fn empty_links_fall_through_to_evaluator() {
        let evaluator = Rc::new(CountingEvaluator {
            calls: Cell::new(0),
            result: Ok("fallback".into()),
        });
        let chain = ValueResolverChain::new(evaluator.clone());
        let item = Track {
            columns: vec![("artist", "")],
            metadata: Some(Metadata::new()),
        };
        assert_eq!(resolve(&chain, &item, Some("artist"), "%artist%"), "fallback");
        assert_eq!(evaluator.calls.get(), 1);
    }

    #[test]
    fn evaluator_errors_resolve_to_empty() {
        let chain = ValueResolverChain::new(Rc::new(CountingEvaluator {
            calls: Cell::new(0),
            result: Err(ScriptError::Evaluation("boom".into())),
        }));
        let item = Track {
            columns: vec![],
            metadata: None,
        };
        assert_eq!(resolve(&chain, &item, None, "$fail()"), "");
    }

    #[test]
    fn custom_links_run_in_order() {
        let chain = ValueResolverChain::with_links(vec![Box::new(ContextVariableResolver)]);
        let item = Track {
            columns: vec![("title", "column")],
            metadata: Some([("title", "context")].into_iter().collect()),
        };
        assert_eq!(resolve(&chain, &item, Some("title"), "%title%"), "context");
        assert_eq!(resolve(&chain, &item, None, "%title%"), "");
    }
}
