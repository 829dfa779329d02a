use crate::environment::{NameGenerator, Variable};
use crate::error::{CompileError, Result};
use crate::msgbox;
use crate::operand::Operand;
use crate::statements;

/// How a call hands its result back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convention {
    /// No result; binding one is an error.
    Void,
    /// A result slot that may be left out.
    Optional,
    /// The primitive always writes a result.
    Required,
    /// Success or failure is signalled through the error flag.
    ErrorFlag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinStyle {
    /// Plain instruction: `Name arg...`
    Instruction,
    /// Header macro: `${Name} arg...`
    Header,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Builtin {
    name: &'static str,
    style: BuiltinStyle,
    min_args: usize,
    max_args: usize,
    convention: Convention,
    /// Position of the result among the emitted arguments.
    result_index: usize,
}

impl Builtin {
    pub const fn instruction(
        name: &'static str,
        min_args: usize,
        max_args: usize,
        convention: Convention,
        result_index: usize,
    ) -> Self {
        Self {
            name,
            style: BuiltinStyle::Instruction,
            min_args,
            max_args,
            convention,
            result_index,
        }
    }

    pub const fn header(
        name: &'static str,
        args: usize,
        result_index: usize,
    ) -> Self {
        Self {
            name,
            style: BuiltinStyle::Header,
            min_args: args,
            max_args: args,
            convention: Convention::Required,
            result_index,
        }
    }

    pub fn style(&self) -> BuiltinStyle {
        self.style
    }

    fn statement_for(
        &self,
        indent: &str,
        args: &[Operand],
        result: Option<&Variable>,
    ) -> String {
        let mut operands = args.to_vec();
        if matches!(self.convention, Convention::Optional | Convention::Required)
        {
            if let Some(result) = result {
                let at = self.result_index.min(operands.len());
                operands.insert(at, Operand::Variable(result.clone()));
            }
        }
        let mut out = match self.style {
            BuiltinStyle::Instruction => format!("{}{}", indent, self.name),
            BuiltinStyle::Header => format!("{}${{{}}}", indent, self.name),
        };
        for operand in operands.iter().filter(|op| !op.is_null()) {
            out.push(' ');
            out.push_str(&operand.value());
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFunction {
    name: String,
    label: String,
    params: Vec<Variable>,
    has_return: bool,
    forward_calls: Vec<usize>,
}

impl UserFunction {
    pub(crate) fn new(name: &str, label: &str, forward_calls: Vec<usize>) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            params: Vec::new(),
            has_return: false,
            forward_calls,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn params(&self) -> &[Variable] {
        &self.params
    }

    pub fn add_param(&mut self, param: Variable) {
        self.params.push(param);
    }

    pub fn has_return(&self) -> bool {
        self.has_return
    }

    pub fn set_has_return(&mut self) {
        self.has_return = true;
    }

    /// Argument counts of calls compiled before this declaration.
    pub fn forward_calls(&self) -> &[usize] {
        &self.forward_calls
    }

    /// Every earlier call must have passed exactly the declared parameters.
    pub fn check_forward_calls(&self) -> Result<()> {
        let expected = self.params.len();
        for &provided in &self.forward_calls {
            if provided < expected {
                return Err(CompileError::TooFewArguments {
                    callable: self.label.clone(),
                    expected,
                    provided,
                });
            }
            if provided > expected {
                return Err(CompileError::TooManyArguments {
                    callable: self.label.clone(),
                    expected,
                    provided,
                });
            }
        }
        Ok(())
    }
}

/// Stand-in for a function that is called before it is declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdHocFunction {
    name: String,
    label: String,
    calls: Vec<usize>,
}

impl AdHocFunction {
    pub(crate) fn new(name: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            calls: Vec::new(),
        }
    }

    pub fn calls(&self) -> &[usize] {
        &self.calls
    }

    pub(crate) fn record_call(&mut self, args: usize) {
        self.calls.push(args);
    }
}

/// Library callables composed from several target statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Custom {
    MsgBox,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callable {
    Builtin(Builtin),
    User(UserFunction),
    AdHoc(AdHocFunction),
    Custom(Custom),
}

impl Callable {
    pub fn name(&self) -> &str {
        match self {
            Self::Builtin(builtin) => builtin.name,
            Self::User(function) => &function.name,
            Self::AdHoc(adhoc) => &adhoc.name,
            Self::Custom(Custom::MsgBox) => msgbox::NAME,
        }
    }

    pub fn min_args(&self) -> usize {
        match self {
            Self::Builtin(builtin) => builtin.min_args,
            Self::User(function) => function.params.len(),
            Self::AdHoc(_) => 0,
            Self::Custom(Custom::MsgBox) => msgbox::MIN_ARGS,
        }
    }

    /// `None` means unbounded.
    pub fn max_args(&self) -> Option<usize> {
        match self {
            Self::Builtin(builtin) => Some(builtin.max_args),
            Self::User(function) => Some(function.params.len()),
            Self::AdHoc(_) => None,
            Self::Custom(Custom::MsgBox) => Some(msgbox::MAX_ARGS),
        }
    }

    pub fn convention(&self) -> Convention {
        match self {
            Self::Builtin(builtin) => builtin.convention,
            Self::User(_) | Self::AdHoc(_) => Convention::Optional,
            Self::Custom(Custom::MsgBox) => Convention::Optional,
        }
    }

    /// Target text for a call with validated arguments.
    pub fn statement_for(
        &self,
        indent: &str,
        args: &[Operand],
        result: Option<&Variable>,
        names: &mut NameGenerator,
    ) -> Result<String> {
        match self {
            Self::Builtin(builtin) => {
                Ok(builtin.statement_for(indent, args, result))
            }
            Self::User(function) => Ok(statements::call_function(
                indent,
                &function.label,
                args,
                result,
            )),
            Self::AdHoc(adhoc) => Ok(statements::call_function(
                indent,
                &adhoc.label,
                args,
                result,
            )),
            Self::Custom(Custom::MsgBox) => {
                msgbox::statement_for(indent, args, result, names)
            }
        }
    }
}
