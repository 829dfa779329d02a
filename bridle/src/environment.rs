use std::collections::HashMap;
use std::fmt;

use crate::builtins;
use crate::callable::{AdHocFunction, Callable, UserFunction};
use crate::error::{CompileError, Result};

/// Owner of a [`Variable`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    /// Lowercased name of the enclosing user function.
    Function(String),
}

impl Scope {
    pub fn function(name: Option<&str>) -> Self {
        match name {
            Some(name) => Self::Function(name.to_string()),
            None => Self::Global,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global scope"),
            Self::Function(name) => write!(f, "function '{}'", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    name: String,
    scope: Scope,
    target_name: String,
}

impl Variable {
    fn new(name: &str, scope: Scope) -> Self {
        let target_name = match &scope {
            Scope::Global => name.to_string(),
            Scope::Function(function) => format!("{}.{}", function, name),
        };
        Self {
            name: name.to_string(),
            scope,
            target_name,
        }
    }

    fn builtin(name: &str, target_name: &str) -> Self {
        Self {
            name: name.to_string(),
            scope: Scope::Global,
            target_name: target_name.to_string(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Name used in `Var` declarations.
    #[inline]
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// The dereferenced form, e.g. `$count` or `$INSTDIR`.
    pub fn value(&self) -> String {
        format!("${}", self.target_name)
    }
}

/// Collision-free synthetic identifiers for temporaries and labels.
#[derive(Debug, Default)]
pub struct NameGenerator {
    next: u64,
}

impl NameGenerator {
    pub const PREFIX: &'static str = "bridle_";

    pub fn generate(&mut self) -> String {
        self.next += 1;
        format!("{}{}", Self::PREFIX, self.next)
    }

    /// Source names must stay out of the generated namespace, which also
    /// holds the run-wide registers.
    pub fn check_user_name(name: &str) -> Result<()> {
        if name.to_lowercase().starts_with(Self::PREFIX) {
            return Err(CompileError::semantic(format!(
                "'{}' is reserved for names generated by the compiler",
                name
            )));
        }
        Ok(())
    }
}

/// Variable and callable registries for one compilation run.
#[derive(Debug, Default)]
pub struct Environment {
    variables: HashMap<(String, Scope), Variable>,
    callables: HashMap<String, Callable>,
    names: NameGenerator,
}

impl Environment {
    /// An environment with no builtins at all.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut env = Self::new();
        for (name, target) in builtins::VARIABLES {
            env.register_builtin_variable(name, target);
        }
        for builtin in builtins::INSTRUCTIONS.iter().chain(builtins::HEADERS) {
            env.register_callable(Callable::Builtin(*builtin));
        }
        for custom in builtins::CUSTOM {
            env.register_callable(Callable::Custom(*custom));
        }
        env
    }

    pub fn names(&mut self) -> &mut NameGenerator {
        &mut self.names
    }

    pub(crate) fn register_builtin_variable(&mut self, name: &str, target: &str) {
        self.variables.insert(
            (name.to_string(), Scope::Global),
            Variable::builtin(name, target),
        );
    }

    pub(crate) fn register_callable(&mut self, callable: Callable) {
        self.callables
            .insert(callable.name().to_lowercase(), callable);
    }

    pub fn register_variable(
        &mut self,
        name: &str,
        scope: Scope,
    ) -> Result<Variable> {
        let key = (name.to_string(), scope);
        if self.variables.contains_key(&key) {
            return Err(CompileError::DuplicateDeclaration {
                name: key.0,
                scope: key.1,
            });
        }
        let variable = Variable::new(name, key.1.clone());
        self.variables.insert(key, variable.clone());
        Ok(variable)
    }

    /// Exact `(name, scope)` probe, no fallback to the global scope.
    pub fn contains_variable(&self, name: &str, scope: &Scope) -> bool {
        self.variables
            .contains_key(&(name.to_string(), scope.clone()))
    }

    /// Innermost visible variable: the function scope first, then global.
    pub fn find_variable(
        &self,
        name: &str,
        function: Option<&str>,
    ) -> Option<&Variable> {
        if let Some(function) = function {
            let key = (name.to_string(), Scope::Function(function.to_string()));
            if let Some(variable) = self.variables.get(&key) {
                return Some(variable);
            }
        }
        self.variables.get(&(name.to_string(), Scope::Global))
    }

    pub fn get_variable(
        &self,
        name: &str,
        function: Option<&str>,
    ) -> Result<Variable> {
        self.find_variable(name, function).cloned().ok_or_else(|| {
            CompileError::UndefinedVariable {
                name: name.to_string(),
            }
        })
    }

    /// Registers `name` as a user function, replacing an ad-hoc placeholder
    /// left behind by earlier calls.
    pub fn register_user_function(
        &mut self,
        name: &str,
        label: &str,
    ) -> Result<()> {
        let forward_calls = match self.callables.get(name) {
            None => Vec::new(),
            Some(Callable::AdHoc(adhoc)) => adhoc.calls().to_vec(),
            Some(_) => {
                return Err(CompileError::DuplicateDeclaration {
                    name: name.to_string(),
                    scope: Scope::Global,
                });
            }
        };
        let function = UserFunction::new(name, label, forward_calls);
        self.callables
            .insert(name.to_string(), Callable::User(function));
        Ok(())
    }

    pub fn user_function(&self, name: &str) -> Option<&UserFunction> {
        match self.callables.get(name) {
            Some(Callable::User(function)) => Some(function),
            _ => None,
        }
    }

    pub fn user_function_mut(
        &mut self,
        name: &str,
    ) -> Option<&mut UserFunction> {
        match self.callables.get_mut(name) {
            Some(Callable::User(function)) => Some(function),
            _ => None,
        }
    }

    /// Returns the callable registered as `name`, creating an ad-hoc
    /// placeholder when nothing is registered yet.
    pub fn get_callable(&mut self, name: &str, label: &str) -> Callable {
        self.callables
            .entry(name.to_string())
            .or_insert_with(|| {
                Callable::AdHoc(AdHocFunction::new(name, label))
            })
            .clone()
    }

    /// Records the argument count of a call made through a placeholder.
    pub fn record_forward_call(&mut self, name: &str, args: usize) {
        if let Some(Callable::AdHoc(adhoc)) = self.callables.get_mut(name) {
            adhoc.record_call(args);
        }
    }
}
