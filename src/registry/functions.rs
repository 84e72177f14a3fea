//! Template functions: the shared table and the per-page helpers.
//!
//! Shared functions are registered once on the [`Registry`](super::Registry)
//! and copied into every page compiled afterwards. The page helpers close over
//! the name of the page being compiled, so each page gets its own instances:
//!
//! | Function                  | Returns                                   |
//! |---------------------------|-------------------------------------------|
//! | `template_name()`         | the page's own name, e.g. `"Home.html"`   |
//! | `is_template(name="…")`   | whether `name` is this page               |
//! | `comment(text="…")`       | `<!-- text -->`, emitted unescaped        |

use rustc_hash::FxHashMap;
use std::{collections::HashMap, sync::Arc};
use tera::{Function, Tera, Value};

/// Shared function table, keyed by the name templates call it by.
#[derive(Clone, Default)]
pub struct FunctionTable {
    functions: FxHashMap<String, Arc<dyn Function>>,
}

impl std::fmt::Debug for FunctionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("FunctionTable").field("functions", &names).finish()
    }
}

impl FunctionTable {
    /// Add or overwrite a function.
    pub fn insert<F: Function + 'static>(&mut self, name: &str, function: F) {
        self.functions.insert(name.to_owned(), Arc::new(function));
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Register the shared table plus the helpers bound to `page`.
    ///
    /// Shared entries are installed last, so a registered function may
    /// shadow a built-in helper of the same name.
    pub(crate) fn install(&self, tera: &mut Tera, page: &str) {
        tera.register_function("template_name", TemplateName(page.to_owned()));
        tera.register_function("is_template", IsTemplate(page.to_owned()));
        tera.register_function("comment", Comment);

        for (name, function) in &self.functions {
            tera.register_function(name, Shared(Arc::clone(function)));
        }
    }
}

/// Adapter so one shared function can be registered on many Tera instances.
struct Shared(Arc<dyn Function>);

impl Function for Shared {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        self.0.call(args)
    }

    fn is_safe(&self) -> bool {
        self.0.is_safe()
    }
}

struct TemplateName(String);

impl Function for TemplateName {
    fn call(&self, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        Ok(Value::String(self.0.clone()))
    }
}

struct IsTemplate(String);

impl Function for IsTemplate {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let name = string_arg(args, "is_template", "name")?;
        Ok(Value::Bool(name == self.0))
    }
}

struct Comment;

impl Function for Comment {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let text = string_arg(args, "comment", "text")?;
        // "--" would end the comment early
        Ok(Value::String(format!("<!-- {} -->", text.replace("--", "- -"))))
    }

    fn is_safe(&self) -> bool {
        true
    }
}

fn string_arg<'a>(
    args: &'a HashMap<String, Value>,
    function: &str,
    key: &str,
) -> tera::Result<&'a str> {
    args.get(key).and_then(Value::as_str).ok_or_else(|| {
        tera::Error::msg(format!("`{function}` expects a string argument `{key}`"))
    })
}
