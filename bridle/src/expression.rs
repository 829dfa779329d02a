//! Expressions and comparison terms.
//!
//! Nested calls are hoisted into generated temporaries whose declaration
//! and call text go to `buffer`, ahead of the statement that uses them.
//! Concatenation is folded at compile time into one string literal in
//! which variables stay dereferenced (`"a" & x` becomes `"a$x"`).

use log::debug;

use crate::compiler::StatementCompiler;
use crate::error::{CompileError, Result};
use crate::operand::{CompareKeyword, ComparisonStatement, Operand};
use crate::word::{Word, WordKind, WordStream};

impl StatementCompiler {
    pub(crate) fn expression(
        &mut self,
        word: Word,
        reader: &mut impl WordStream,
        buffer: &mut Vec<String>,
    ) -> Result<Operand> {
        self.nested(|this| {
            let (call, concatenation) = {
                let tail = reader.word_tail();
                (tail.is_args_open(), tail.is_concatenation())
            };
            if call {
                let result = this.in_expression_call(&word, reader, buffer)?;
                this.expression_rest(result, reader, buffer)
            } else if concatenation {
                let left = this.resolve_word(&word)?;
                this.expression_rest(left, reader, buffer)
            } else {
                this.resolve_word(&word)
            }
        })
    }

    /// Folds any `& operand` that follows `left`. Stops at a pending `)`
    /// or comparison operator, which belong to an enclosing construct.
    pub(crate) fn expression_rest(
        &mut self,
        left: Operand,
        reader: &mut impl WordStream,
        buffer: &mut Vec<String>,
    ) -> Result<Operand> {
        let mut value = left;
        loop {
            let tail = reader.word_tail();
            if !tail.is_concatenation()
                || tail.is_args_close()
                || tail.is_comparison()
            {
                return Ok(value);
            }
            value = self.concatenate_with_next(value, reader, buffer)?;
        }
    }

    fn concatenate_with_next(
        &mut self,
        left: Operand,
        reader: &mut impl WordStream,
        buffer: &mut Vec<String>,
    ) -> Result<Operand> {
        let word = reader.next_word()?;
        let right = if reader.word_tail().is_args_open() {
            self.in_expression_call(&word, reader, buffer)?
        } else {
            self.resolve_word(&word)?
        };
        Ok(Operand::string(&format!("{}{}", left.bare(), right.bare())))
    }

    /// Compiles a call whose result is needed as a value, binding it to a
    /// fresh temporary.
    fn in_expression_call(
        &mut self,
        name: &Word,
        reader: &mut impl WordStream,
        buffer: &mut Vec<String>,
    ) -> Result<Operand> {
        let result = self.register_and_declare(None, reader, buffer)?;
        debug!(
            "{}:{}: Hold result of '{}' in '{}'",
            reader.source_name(),
            reader.lines_read(),
            name.value(),
            result.target_name()
        );
        self.call_into(name, Some(&result), reader, buffer)?;
        Ok(Operand::Variable(result))
    }

    pub(crate) fn resolve_word(&self, word: &Word) -> Result<Operand> {
        match word.kind() {
            WordKind::Name => {
                let variable = self
                    .environment
                    .get_variable(&word.as_name(), self.function.as_deref())?;
                Ok(Operand::Variable(variable))
            }
            _ => Ok(Operand::from_word(word)),
        }
    }

    /// One comparison term opened by `keyword`. Terms joined inside it
    /// with `and`/`or` are returned after it, in source order.
    ///
    /// A joined term stays open until it takes an operator and its right
    /// operand; words after that belong to the term that was open before.
    pub(crate) fn comparison(
        &mut self,
        keyword: CompareKeyword,
        reader: &mut impl WordStream,
        buffer: &mut Vec<String>,
    ) -> Result<Vec<ComparisonStatement>> {
        self.nested(|this| {
            let mut terms = vec![this.comparison_start(keyword, reader, buffer)?];
            let mut open = vec![0];

            while let Some(&current) = open.last() {
                let operator = reader.word_tail().comparison().map(str::to_string);
                if let Some(op) = operator {
                    if !reader.has_next_word() {
                        return Err(CompileError::syntax(format!(
                            "Missing right operand for '{}'",
                            op
                        )));
                    }
                    let right = reader.next_word()?;
                    let right = this.expression(right, reader, buffer)?;
                    terms[current].set_comparison(op, right);
                    open.pop();
                    continue;
                }
                if !reader.has_next_word() {
                    break;
                }
                let word = reader.next_word()?;
                match CompareKeyword::from_name(&word.as_name()) {
                    Some(k @ (CompareKeyword::And | CompareKeyword::Or))
                        if word.kind() == WordKind::Name =>
                    {
                        terms.push(this.comparison_start(k, reader, buffer)?);
                        open.push(terms.len() - 1);
                    }
                    _ => {
                        let operand = this.expression(word, reader, buffer)?;
                        terms[current].add_left(operand);
                    }
                }
            }
            Ok(terms)
        })
    }

    /// Opens a term: the optional `not` and its first left operand.
    fn comparison_start(
        &mut self,
        keyword: CompareKeyword,
        reader: &mut impl WordStream,
        buffer: &mut Vec<String>,
    ) -> Result<ComparisonStatement> {
        let mut statement = ComparisonStatement::new(keyword);
        let mut left = reader.next_word()?;
        if left.kind() == WordKind::Name && left.as_name() == "not" {
            statement.set_not();
            left = reader.next_word()?;
        }
        statement.add_left(self.expression(left, reader, buffer)?);
        Ok(statement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Scope;
    use crate::operand::Connective;
    use crate::statements::NEWLINE;
    use crate::word::InputReader;

    fn reader(code: &str) -> InputReader {
        let mut reader = InputReader::new(code, "test");
        assert!(reader.go_to_next_statement().expect("tokenize"));
        reader
    }

    fn compiler_with(vars: &[&str]) -> StatementCompiler {
        let mut compiler = StatementCompiler::default();
        for var in vars {
            compiler
                .environment
                .register_variable(var, Scope::Global)
                .expect("register");
        }
        compiler
    }

    fn expression_of(
        compiler: &mut StatementCompiler,
        code: &str,
    ) -> Result<(Operand, Vec<String>)> {
        let mut reader = reader(code);
        let word = reader.next_word()?;
        let mut buffer = Vec::new();
        let value = compiler.expression(word, &mut reader, &mut buffer)?;
        Ok((value, buffer))
    }

    #[test]
    fn test_plain_word() {
        let mut compiler = compiler_with(&["x"]);
        let (value, buffer) = expression_of(&mut compiler, "x").unwrap();
        assert_eq!(value.value(), "$x");
        assert!(buffer.is_empty());
        let (value, _) = expression_of(&mut compiler, "42").unwrap();
        assert_eq!(value.value(), "42");
    }

    #[test]
    fn test_concatenation_folds_into_literal() {
        let mut compiler = compiler_with(&["x"]);
        let (value, buffer) =
            expression_of(&mut compiler, "\"a\" & x & \"b\"").unwrap();
        assert_eq!(value.value(), "\"a$xb\"");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_undefined_name_in_expression() {
        let mut compiler = compiler_with(&[]);
        assert!(matches!(
            expression_of(&mut compiler, "\"a\" & nope"),
            Err(CompileError::UndefinedVariable { .. })
        ));
    }

    #[test]
    fn test_call_is_hoisted_to_temporary() {
        let mut compiler = compiler_with(&[]);
        let (value, buffer) =
            expression_of(&mut compiler, "StrLen(\"abc\") & \"!\"").unwrap();
        assert_eq!(value.value(), "\"$bridle_1!\"");
        assert_eq!(
            buffer.join(NEWLINE),
            "Var /GLOBAL bridle_1\r\nStrLen $bridle_1 \"abc\""
        );
    }

    #[test]
    fn test_nested_calls_inside_out() {
        let mut compiler = compiler_with(&[]);
        let (value, buffer) = expression_of(
            &mut compiler,
            "GetParent(GetParent(\"C:\\a\\b\"))",
        )
        .unwrap();
        assert_eq!(value.value(), "$bridle_1");
        assert_eq!(
            buffer,
            vec![
                "Var /GLOBAL bridle_1",
                "Var /GLOBAL bridle_2",
                "${GetParent} \"C:\\a\\b\" $bridle_2",
                "${GetParent} $bridle_2 $bridle_1",
            ]
        );
    }

    #[test]
    fn test_comparison_with_operator() {
        let mut compiler = compiler_with(&["x"]);
        let mut reader = reader("x == 1");
        let mut buffer = Vec::new();
        let terms = compiler
            .comparison(CompareKeyword::If, &mut reader, &mut buffer)
            .unwrap();
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0].left().len(), 1);
        assert_eq!(terms[0].left()[0].value(), "$x");
        let (op, right) = terms[0].comparison().unwrap();
        assert_eq!(op, "==");
        assert_eq!(right.value(), "1");
    }

    #[test]
    fn test_comparison_splices_joined_terms() {
        let mut compiler = compiler_with(&["a", "b", "c"]);
        let mut reader = reader("a and b == 1 or not c");
        let mut buffer = Vec::new();
        let terms = compiler
            .comparison(CompareKeyword::If, &mut reader, &mut buffer)
            .unwrap();
        let connectives: Vec<Connective> =
            terms.iter().map(ComparisonStatement::connective).collect();
        assert_eq!(
            connectives,
            vec![Connective::None, Connective::And, Connective::Or]
        );
        assert!(terms[2].is_not());
    }

    #[test]
    fn test_comparison_missing_right_operand() {
        let mut compiler = compiler_with(&["x"]);
        let mut reader = reader("x ==");
        let mut buffer = Vec::new();
        assert!(matches!(
            compiler.comparison(CompareKeyword::If, &mut reader, &mut buffer),
            Err(CompileError::Syntax(_))
        ));
    }

    #[test]
    fn test_long_flat_chain_is_not_nesting() {
        let names: Vec<String> = (0..100).map(|i| format!("v{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut compiler = compiler_with(&refs);
        let mut reader = reader(&names.join(" and "));
        let mut buffer = Vec::new();
        let terms = compiler
            .comparison(CompareKeyword::If, &mut reader, &mut buffer)
            .unwrap();
        assert_eq!(terms.len(), 100);
        assert!(terms[1..]
            .iter()
            .all(|term| term.connective() == Connective::And));
        assert_eq!(compiler.depth, 0);
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let mut compiler = compiler_with(&[]);
        let depth = crate::compiler::MAX_NESTING + 1;
        let code =
            format!("{}\"x\"{}", "StrLen(".repeat(depth), ")".repeat(depth));
        let err = expression_of(&mut compiler, &code).unwrap_err();
        assert!(
            matches!(err, CompileError::Syntax(ref m) if m.contains("nested"))
        );
    }
}
