//! NSIS statement formatting.
//!
//! Every function here is pure: operands come in already resolved, text
//! comes out. Multi-line results are joined with [`NEWLINE`].

use crate::environment::Variable;
use crate::operand::{ComparisonStatement, Operand};

pub const NEWLINE: &str = "\r\n";
pub const DEFAULT_INDENT: &str = "    ";

/// `!define` holding the value of omitted optional arguments.
pub const NULL_DEFINE: &str = "BRIDLE_NULL";

/// Global variable user functions leave their return value in.
pub const RETURN_REGISTER: &str = "bridle_return";

/// Global variable discarded required results are written to.
pub const NULL_RESULT: &str = "bridle_nullvar";

pub fn prelude() -> String {
    [
        "!include \"LogicLib.nsh\"".to_string(),
        "!include \"FileFunc.nsh\"".to_string(),
        format!("!define {} \"BridleNSIS_NULL\"", NULL_DEFINE),
    ]
    .join(NEWLINE)
}

pub fn variable_declare(indent: &str, variable: &Variable) -> String {
    format!("{}Var /GLOBAL {}", indent, variable.target_name())
}

pub fn variable_assign(
    indent: &str,
    variable: &Variable,
    value: &Operand,
) -> String {
    format!("{}StrCpy {} {}", indent, variable.value(), value.value())
}

/// `Function` line followed by popping the parameters off the stack in
/// reverse push order.
pub fn function_begin(indent: &str, label: &str, params: &[Variable]) -> String {
    let mut out = format!("{}Function {}", indent, label);
    for param in params.iter().rev() {
        out.push_str(NEWLINE);
        out.push_str(&format!(
            "{}{}Pop {}",
            indent,
            DEFAULT_INDENT,
            param.value()
        ));
    }
    out
}

pub fn function_return(indent: &str, value: Option<&Operand>) -> String {
    match value {
        Some(value) => format!(
            "{}StrCpy ${} {}{}{}Return",
            indent,
            RETURN_REGISTER,
            value.value(),
            NEWLINE,
            indent
        ),
        None => format!("{}Return", indent),
    }
}

pub fn function_end(indent: &str) -> String {
    format!("{}FunctionEnd", indent)
}

/// Pushes the arguments, calls `label` and copies the return register
/// into `result`.
pub fn call_function(
    indent: &str,
    label: &str,
    args: &[Operand],
    result: Option<&Variable>,
) -> String {
    let mut lines: Vec<String> = args
        .iter()
        .map(|arg| format!("{}Push {}", indent, arg.value()))
        .collect();
    lines.push(format!("{}Call {}", indent, label));
    if let Some(result) = result {
        lines.push(format!(
            "{}StrCpy {} ${}",
            indent,
            result.value(),
            RETURN_REGISTER
        ));
    }
    lines.join(NEWLINE)
}

pub fn label(indent: &str, name: &str) -> String {
    format!("{}{}:", indent, name)
}

pub fn goto(indent: &str, name: &str) -> String {
    format!("{}Goto {}", indent, name)
}

pub fn logic_lib_define(indent: &str, define: &str) -> String {
    format!("{}${{{}}}", indent, define)
}

/// `${<prefix><keyword>[Not]} left... [op right]`
pub fn logic_lib_comparison(
    indent: &str,
    prefix: &str,
    statement: &ComparisonStatement,
) -> String {
    let not = if statement.is_not() { "Not" } else { "" };
    let mut out = format!(
        "{}${{{}{}{}}}",
        indent,
        prefix,
        statement.keyword().macro_name(),
        not
    );
    for left in statement.left() {
        out.push(' ');
        out.push_str(&left.value());
    }
    if let Some((op, right)) = statement.comparison() {
        out.push_str(&format!(" {} {}", op, right.value()));
    }
    out
}

pub fn clear_errors(indent: &str) -> String {
    format!("{}ClearErrors", indent)
}

/// Assigns `value` only while the error flag is clear.
pub fn assign_unless_errors(
    indent: &str,
    variable: &Variable,
    value: &Operand,
) -> String {
    format!(
        "{}${{IfNotThen}} ${{Errors}} ${{|}} StrCpy {} {} ${{|}}",
        indent,
        variable.value(),
        value.value()
    )
}

pub fn include(indent: &str, file: &str) -> String {
    format!("{}!include \"{}\"", indent, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{Environment, Scope};
    use crate::operand::CompareKeyword;

    fn var(env: &mut Environment, name: &str) -> Variable {
        env.register_variable(name, Scope::Global).unwrap()
    }

    #[test]
    fn test_declare_and_assign() {
        let mut env = Environment::new();
        let x = var(&mut env, "x");
        assert_eq!(variable_declare("  ", &x), "  Var /GLOBAL x");
        assert_eq!(
            variable_assign("", &x, &Operand::string("hi")),
            "StrCpy $x \"hi\""
        );
    }

    #[test]
    fn test_function_begin_pops_in_reverse() {
        let mut env = Environment::new();
        let a = env
            .register_variable("a", Scope::Function("foo".into()))
            .unwrap();
        let b = env
            .register_variable("b", Scope::Function("foo".into()))
            .unwrap();
        assert_eq!(
            function_begin("", "Foo", &[a, b]),
            "Function Foo\r\n    Pop $foo.b\r\n    Pop $foo.a"
        );
    }

    #[test]
    fn test_call_function_with_result() {
        let mut env = Environment::new();
        let r = var(&mut env, "r");
        let text =
            call_function("", "Foo", &[Operand::integer(1), Operand::Null], Some(&r));
        assert_eq!(
            text,
            "Push 1\r\nPush \"${BRIDLE_NULL}\"\r\nCall Foo\r\nStrCpy $r $bridle_return"
        );
    }

    #[test]
    fn test_comparison_line() {
        let mut env = Environment::new();
        let x = var(&mut env, "x");
        let mut statement = ComparisonStatement::new(CompareKeyword::And);
        statement.set_not();
        statement.add_left(Operand::Variable(x));
        statement.set_comparison("==", Operand::integer(2));
        assert_eq!(
            logic_lib_comparison("", "", &statement),
            "${AndIfNot} $x == 2"
        );
        let mut statement = ComparisonStatement::new(CompareKeyword::While);
        statement.add_left(Operand::integer(1));
        assert_eq!(logic_lib_comparison("", "Do", &statement), "${DoWhile} 1");
    }

    #[test]
    fn test_assign_unless_errors() {
        let mut env = Environment::new();
        let r = var(&mut env, "r");
        assert_eq!(
            assign_unless_errors("", &r, &Operand::integer(0)),
            "${IfNotThen} ${Errors} ${|} StrCpy $r 0 ${|}"
        );
    }
}
