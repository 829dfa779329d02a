use log::{debug, info, warn};

use crate::callable::{Callable, Convention};
use crate::environment::{Environment, NameGenerator, Scope, Variable};
use crate::error::{CompileError, Result};
use crate::operand::{CompareKeyword, Operand};
use crate::statements::{self, NEWLINE, NULL_RESULT, RETURN_REGISTER};
use crate::word::{Word, WordKind, WordStream};

/// Maximum nesting of expressions, comparisons and calls.
pub const MAX_NESTING: usize = 64;

/// Result of compiling one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compiled {
    Text(String),
    /// `!include "<path>"`, left to the driver.
    Include { indent: String, path: String },
}

/// Single-pass statement compiler.
///
/// Owns the [`Environment`] for the whole run, so declarations made while
/// compiling one file are visible to every file compiled after it.
pub struct StatementCompiler {
    pub(crate) environment: Environment,
    /// Lowercased name of the function being compiled.
    pub(crate) function: Option<String>,
    null_result: Option<Variable>,
    return_register: Option<Variable>,
    pub(crate) depth: usize,
}

impl Default for StatementCompiler {
    fn default() -> Self {
        Self::new(Environment::with_builtins())
    }
}

impl StatementCompiler {
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            function: None,
            null_result: None,
            return_register: None,
            depth: 0,
        }
    }

    pub(crate) fn scope(&self) -> Scope {
        Scope::function(self.function.as_deref())
    }

    pub fn compile_statement(
        &mut self,
        reader: &mut impl WordStream,
    ) -> Result<Compiled> {
        if !reader.has_next_word() {
            return Ok(self.verbatim(reader));
        }
        let word = reader.next_word()?;
        let (assignment, call, command) = {
            let tail = reader.word_tail();
            (
                tail.is_assignment(),
                tail.is_args_open(),
                tail.is_compiler_command(),
            )
        };

        let text = if assignment {
            self.var_assign(&word, reader)?
        } else if call {
            let text = self.call(&word, None, reader)?;
            Self::expect_end(reader)?;
            text
        } else if command {
            return self.compiler_command(reader);
        } else {
            match word.as_name().as_str() {
                "var" => self.var_declare(reader)?,
                "function" => self.function_begin(reader)?,
                "return" => self.function_return(reader)?,
                "functionend" => self.function_end(reader)?,
                "if" | "elseif" => self.if_statement(&word, reader)?,
                "else" => statements::logic_lib_define(reader.indent(), "Else"),
                "endif" => {
                    statements::logic_lib_define(reader.indent(), "EndIf")
                }
                "do" => self.do_loop("Do", reader)?,
                "loop" => self.do_loop("Loop", reader)?,
                "continue" => {
                    statements::logic_lib_define(reader.indent(), "Continue")
                }
                "break" => {
                    statements::logic_lib_define(reader.indent(), "Break")
                }
                _ => return Ok(self.verbatim(reader)),
            }
        };
        Ok(Compiled::Text(text))
    }

    fn verbatim(&self, reader: &impl WordStream) -> Compiled {
        Compiled::Text(reader.current_statement().to_string())
    }

    fn compiler_command(
        &mut self,
        reader: &mut impl WordStream,
    ) -> Result<Compiled> {
        if !reader.has_next_word() || reader.next_word()?.as_name() != "include"
        {
            return Ok(self.verbatim(reader));
        }
        let path = reader.next_word()?;
        if path.kind() == WordKind::Special || reader.has_next_word() {
            // flags such as /NONFATAL are left to the target compiler
            return Ok(self.verbatim(reader));
        }
        Ok(Compiled::Include {
            indent: reader.indent().to_string(),
            path: path.as_bare_string().to_string(),
        })
    }

    // ═══════════════════════════════════════════════════════════════
    // Variables
    // ═══════════════════════════════════════════════════════════════

    pub fn var_declare(&mut self, reader: &mut impl WordStream) -> Result<String> {
        let mut lines = Vec::new();
        let mut name = reader.next_word()?;
        // Var /GLOBAL x
        if name.kind() == WordKind::Special {
            name = reader.next_word()?;
        }
        loop {
            if name.kind() != WordKind::Name {
                return Err(CompileError::syntax(format!(
                    "Invalid variable name '{}'",
                    name.value()
                )));
            }
            let base = name.as_name();
            NameGenerator::check_user_name(&base)?;
            if let Some(function) = &self.function {
                if self.environment.contains_variable(&base, &Scope::Global) {
                    info!(
                        "{}:{}: Declaring variable '{}' in function '{}' that overshadows a global variable with the same name",
                        reader.source_name(),
                        reader.lines_read(),
                        base,
                        function
                    );
                }
            }
            let scope = self.scope();
            let variable = self.environment.register_variable(&base, scope)?;
            debug!(
                "{}:{}: Register new variable '{}'",
                reader.source_name(),
                reader.lines_read(),
                variable.target_name()
            );
            lines.push(statements::variable_declare(reader.indent(), &variable));
            if !reader.has_next_word() {
                break;
            }
            name = reader.next_word()?;
        }
        Ok(lines.join(NEWLINE))
    }

    pub fn var_assign(
        &mut self,
        target: &Word,
        reader: &mut impl WordStream,
    ) -> Result<String> {
        if target.kind() != WordKind::Name {
            return Err(CompileError::syntax(format!(
                "Invalid assignment target '{}'",
                target.value()
            )));
        }
        let mut buffer = Vec::new();
        let name = target.as_name();
        NameGenerator::check_user_name(&name)?;
        let found = self
            .environment
            .find_variable(&name, self.function.as_deref())
            .cloned();
        let variable = match found {
            Some(variable) => variable,
            None => self.register_and_declare(Some(name), reader, &mut buffer)?,
        };

        let word = reader.next_word()?;
        let (concatenation, call) = {
            let tail = reader.word_tail();
            (tail.is_concatenation(), tail.is_args_open())
        };
        let value = if concatenation {
            self.expression(word, reader, &mut buffer)?
        } else if call {
            // Bind the call result straight to the target variable.
            self.call_into(&word, Some(&variable), reader, &mut buffer)?;
            if !reader.word_tail().is_concatenation() {
                Self::expect_end(reader)?;
                return Ok(buffer.join(NEWLINE));
            }
            self.expression_rest(
                Operand::Variable(variable.clone()),
                reader,
                &mut buffer,
            )?
        } else {
            self.resolve_word(&word)?
        };
        Self::expect_end(reader)?;
        buffer.push(statements::variable_assign(
            reader.indent(),
            &variable,
            &value,
        ));
        Ok(buffer.join(NEWLINE))
    }

    fn expect_end(reader: &impl WordStream) -> Result<()> {
        if reader.has_next_word() {
            return Err(CompileError::syntax(
                "Unexpected word at the end of statement",
            ));
        }
        Ok(())
    }

    /// Registers a variable in the current scope (a synthetic one when
    /// `name` is `None`) and emits its declaration.
    pub(crate) fn register_and_declare(
        &mut self,
        name: Option<String>,
        reader: &impl WordStream,
        buffer: &mut Vec<String>,
    ) -> Result<Variable> {
        let name = match name {
            Some(name) => name,
            None => self.environment.names().generate(),
        };
        let scope = self.scope();
        let variable = self.environment.register_variable(&name, scope)?;
        debug!(
            "{}:{}: Register new variable '{}'",
            reader.source_name(),
            reader.lines_read(),
            variable.target_name()
        );
        buffer.push(statements::variable_declare(reader.indent(), &variable));
        Ok(variable)
    }

    /// A run-wide global, declared on first use.
    fn shared_global(
        &mut self,
        name: &str,
        indent: &str,
        buffer: &mut Vec<String>,
    ) -> Result<Variable> {
        let variable = self.environment.register_variable(name, Scope::Global)?;
        buffer.push(statements::variable_declare(indent, &variable));
        Ok(variable)
    }

    fn null_result(
        &mut self,
        indent: &str,
        buffer: &mut Vec<String>,
    ) -> Result<Variable> {
        if let Some(variable) = &self.null_result {
            return Ok(variable.clone());
        }
        let variable = self.shared_global(NULL_RESULT, indent, buffer)?;
        self.null_result = Some(variable.clone());
        Ok(variable)
    }

    fn ensure_return_register(
        &mut self,
        indent: &str,
        buffer: &mut Vec<String>,
    ) -> Result<()> {
        if self.return_register.is_none() {
            let variable = self.shared_global(RETURN_REGISTER, indent, buffer)?;
            self.return_register = Some(variable);
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════
    // Functions
    // ═══════════════════════════════════════════════════════════════

    pub fn function_begin(
        &mut self,
        reader: &mut impl WordStream,
    ) -> Result<String> {
        if self.function.is_some() {
            return Err(CompileError::syntax(
                "Cannot declare function within a function",
            ));
        }
        let name_word = reader.next_word()?;
        let name = name_word.as_name();
        self.environment
            .register_user_function(&name, name_word.value())?;
        self.function = Some(name.clone());
        debug!(
            "{}:{}: Register new function '{}'",
            reader.source_name(),
            reader.lines_read(),
            name_word.value()
        );

        let mut buffer = Vec::new();
        let has_params = {
            let tail = reader.word_tail();
            !tail.is_empty() && !tail.is_args_close()
        };
        if has_params {
            loop {
                let param = reader.next_word()?;
                if param.kind() != WordKind::Name {
                    return Err(CompileError::syntax(format!(
                        "Invalid function parameter '{}'",
                        param.value()
                    )));
                }
                NameGenerator::check_user_name(&param.as_name())?;
                let variable = self.register_and_declare(
                    Some(param.as_name()),
                    reader,
                    &mut buffer,
                )?;
                if let Some(function) = self.environment.user_function_mut(&name)
                {
                    function.add_param(variable);
                }
                if !reader.word_tail().is_arg_separator() {
                    break;
                }
            }
            if !reader.word_tail().is_args_close() {
                return Err(CompileError::syntax(
                    "Unterminated function definition",
                ));
            }
        }
        if reader.has_next_word() {
            return Err(CompileError::syntax(
                "Unexpected word in function argument",
            ));
        }

        let function = self
            .environment
            .user_function(&name)
            .ok_or_else(|| CompileError::semantic("Function vanished"))?;
        function.check_forward_calls()?;
        buffer.push(statements::function_begin(
            reader.indent(),
            function.label(),
            function.params(),
        ));
        Ok(buffer.join(NEWLINE))
    }

    pub fn function_return(
        &mut self,
        reader: &mut impl WordStream,
    ) -> Result<String> {
        let Some(name) = self.function.clone() else {
            return Err(CompileError::syntax(
                "Return is not allowed outside function",
            ));
        };
        if !reader.has_next_word() {
            return Ok(statements::function_return(reader.indent(), None));
        }
        if let Some(function) = self.environment.user_function_mut(&name) {
            function.set_has_return();
        }
        let mut buffer = Vec::new();
        let word = reader.next_word()?;
        let value = self.expression(word, reader, &mut buffer)?;
        Self::expect_end(reader)?;
        self.ensure_return_register(reader.indent(), &mut buffer)?;
        buffer.push(statements::function_return(reader.indent(), Some(&value)));
        Ok(buffer.join(NEWLINE))
    }

    pub fn function_end(&mut self, reader: &mut impl WordStream) -> Result<String> {
        if self.function.take().is_none() {
            return Err(CompileError::syntax(
                "FunctionEnd is not allowed outside function",
            ));
        }
        Ok(statements::function_end(reader.indent()))
    }

    // ═══════════════════════════════════════════════════════════════
    // Calls
    // ═══════════════════════════════════════════════════════════════

    /// Compiles `name(args...)`, optionally binding the result to `result`.
    pub fn call(
        &mut self,
        name: &Word,
        result: Option<&Variable>,
        reader: &mut impl WordStream,
    ) -> Result<String> {
        let mut buffer = Vec::new();
        self.call_into(name, result, reader, &mut buffer)?;
        Ok(buffer.join(NEWLINE))
    }

    pub(crate) fn call_into(
        &mut self,
        name: &Word,
        result: Option<&Variable>,
        reader: &mut impl WordStream,
        buffer: &mut Vec<String>,
    ) -> Result<()> {
        let callable =
            self.environment.get_callable(&name.as_name(), name.value());
        match &callable {
            Callable::AdHoc(_) => info!(
                "{}:{}: Calling unintroduced function '{}'",
                reader.source_name(),
                reader.lines_read(),
                name.value()
            ),
            Callable::User(function)
                if result.is_some()
                    && !function.has_return()
                    && self.function.as_deref() != Some(callable.name()) =>
            {
                warn!(
                    "{}:{}: Function '{}' never returns a value",
                    reader.source_name(),
                    reader.lines_read(),
                    function.label()
                )
            }
            _ => {}
        }
        let args = self.nested(|this| {
            this.arguments(&callable, result, reader, buffer)
        })?;
        self.emit_call(reader.indent(), &callable, &args, result, buffer)
    }

    /// Parses the argument list up to its closing parenthesis, validates
    /// the count and pads omitted optional arguments.
    fn arguments(
        &mut self,
        callable: &Callable,
        result: Option<&Variable>,
        reader: &mut impl WordStream,
        buffer: &mut Vec<String>,
    ) -> Result<Vec<Operand>> {
        if callable.convention() == Convention::Void && result.is_some() {
            return Err(CompileError::semantic(format!(
                "Function '{}' doesn't return a value",
                callable.name()
            )));
        }

        let mut args = Vec::new();
        if !reader.word_tail().is_args_close() {
            loop {
                let word = reader.next_word()?;
                let nested = {
                    let tail = reader.word_tail();
                    tail.is_args_open()
                        || (tail.is_concatenation() && !tail.is_args_close())
                };
                let arg = if nested {
                    self.expression(word, reader, buffer)?
                } else {
                    self.resolve_word(&word)?
                };
                args.push(arg);
                let tail = reader.word_tail();
                if !tail.is_arg_separator() || tail.is_args_close() {
                    break;
                }
            }
            if !reader.word_tail().is_args_close() {
                return Err(CompileError::syntax("Unterminated function call"));
            }
        }
        // The closing parenthesis belongs to this call only.
        reader.consume_args_close();

        let provided = args.len();
        let max = callable.max_args();
        if let Some(max) = max {
            if provided > max {
                return Err(CompileError::TooManyArguments {
                    callable: callable.name().to_string(),
                    expected: max,
                    provided,
                });
            }
        }
        if provided < callable.min_args() {
            return Err(CompileError::TooFewArguments {
                callable: callable.name().to_string(),
                expected: callable.min_args(),
                provided,
            });
        }
        if let Callable::AdHoc(_) = callable {
            self.environment
                .record_forward_call(&callable.name().to_lowercase(), provided);
        }
        if let Some(max) = max {
            args.resize(max, Operand::Null);
        }
        Ok(args)
    }

    /// Emits the call together with whatever its convention needs around
    /// it.
    fn emit_call(
        &mut self,
        indent: &str,
        callable: &Callable,
        args: &[Operand],
        result: Option<&Variable>,
        buffer: &mut Vec<String>,
    ) -> Result<()> {
        let convention = callable.convention();
        let result = match (convention, result) {
            (Convention::Required, None) => {
                Some(self.null_result(indent, buffer)?)
            }
            (_, result) => result.cloned(),
        };

        let error_flag = match (convention, &result) {
            (Convention::ErrorFlag, Some(result)) => Some(result.clone()),
            _ => None,
        };
        if let Some(result) = &error_flag {
            buffer.push(statements::variable_assign(
                indent,
                result,
                &Operand::integer(1),
            ));
            buffer.push(statements::clear_errors(indent));
        }
        let via_register =
            matches!(callable, Callable::User(_) | Callable::AdHoc(_));
        if result.is_some() && via_register {
            self.ensure_return_register(indent, buffer)?;
        }

        buffer.push(callable.statement_for(
            indent,
            args,
            result.as_ref(),
            self.environment.names(),
        )?);

        if let Some(result) = &error_flag {
            buffer.push(statements::assign_unless_errors(
                indent,
                result,
                &Operand::integer(0),
            ));
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════
    // Control flow
    // ═══════════════════════════════════════════════════════════════

    pub fn if_statement(
        &mut self,
        keyword: &Word,
        reader: &mut impl WordStream,
    ) -> Result<String> {
        let keyword = match CompareKeyword::from_name(&keyword.as_name()) {
            Some(k @ (CompareKeyword::If | CompareKeyword::ElseIf)) => k,
            _ => {
                return Err(CompileError::syntax(format!(
                    "Unexpected word '{}'",
                    keyword.value()
                )));
            }
        };
        let mut buffer = Vec::new();
        let mut comparisons = self.comparison(keyword, reader, &mut buffer)?;
        while reader.has_next_word() {
            let word = reader.next_word()?;
            let connective = match CompareKeyword::from_name(&word.as_name()) {
                Some(k @ (CompareKeyword::And | CompareKeyword::Or)) => k,
                _ => {
                    return Err(CompileError::syntax(format!(
                        "Expected 'And' or 'Or', found '{}'",
                        word.value()
                    )));
                }
            };
            comparisons.extend(self.comparison(connective, reader, &mut buffer)?);
        }
        for comparison in &comparisons {
            buffer.push(statements::logic_lib_comparison(
                reader.indent(),
                "",
                comparison,
            ));
        }
        Ok(buffer.join(NEWLINE))
    }

    /// `Do`/`Loop`, optionally followed by a single `While`/`Until` term.
    pub fn do_loop(
        &mut self,
        define: &str,
        reader: &mut impl WordStream,
    ) -> Result<String> {
        if !reader.has_next_word() {
            return Ok(statements::logic_lib_define(reader.indent(), define));
        }
        let word = reader.next_word()?;
        let keyword = match CompareKeyword::from_name(&word.as_name()) {
            Some(k @ (CompareKeyword::While | CompareKeyword::Until)) => k,
            _ => {
                return Err(CompileError::syntax(format!(
                    "Expected 'While' or 'Until' after '{}', found '{}'",
                    define,
                    word.value()
                )));
            }
        };
        let mut buffer = Vec::new();
        let comparisons = self.comparison(keyword, reader, &mut buffer)?;
        let [comparison] = comparisons.as_slice() else {
            return Err(CompileError::syntax("Illegal loop syntax"));
        };
        if reader.has_next_word() {
            return Err(CompileError::syntax("Illegal loop syntax"));
        }
        if comparison.is_not() {
            return Err(CompileError::syntax(format!(
                "Illegal modifier 'Not' in {} statement",
                define
            )));
        }
        buffer.push(statements::logic_lib_comparison(
            reader.indent(),
            define,
            comparison,
        ));
        Ok(buffer.join(NEWLINE))
    }

    /// Runs `f` one nesting level deeper.
    pub(crate) fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        if self.depth >= MAX_NESTING {
            return Err(CompileError::syntax("expression too deeply nested"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }
}
