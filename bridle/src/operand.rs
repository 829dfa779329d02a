use crate::environment::Variable;
use crate::statements::NULL_DEFINE;
use crate::word::{Word, strip_quotes};

/// A string, an integer, or target-language text passed through as is
/// (`$INSTDIR`, `${Errors}`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    value: String,
}

impl Literal {
    /// A quoted string literal holding `text`.
    pub fn string(text: &str) -> Self {
        Self {
            value: format!("\"{}\"", text),
        }
    }

    pub fn integer(value: i64) -> Self {
        Self {
            value: value.to_string(),
        }
    }

    #[inline]
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// A synthesized dialog outcome: the returned button name plus the label
/// the native dialog jumps to for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnOption {
    button: &'static str,
    label: String,
}

impl ReturnOption {
    pub fn new(button: &'static str, label: String) -> Self {
        Self { button, label }
    }

    pub fn id(&self) -> String {
        format!("ID{}", self.button)
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// A resolved value as it appears in emitted statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Literal(Literal),
    Variable(Variable),
    ReturnOption(ReturnOption),
    /// Placeholder for an omitted optional argument.
    Null,
}

impl Operand {
    pub fn string(text: &str) -> Self {
        Self::Literal(Literal::string(text))
    }

    pub fn integer(value: i64) -> Self {
        Self::Literal(Literal::integer(value))
    }

    /// Literal operand for a non-name word.
    pub fn from_word(word: &Word) -> Self {
        Self::Literal(Literal {
            value: word.value().to_string(),
        })
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Text as written into a statement.
    pub fn value(&self) -> String {
        match self {
            Self::Literal(literal) => literal.value.clone(),
            Self::Variable(variable) => variable.value(),
            Self::ReturnOption(option) => format!("\"{}\"", option.button),
            Self::Null => format!("\"${{{}}}\"", NULL_DEFINE),
        }
    }

    /// Text as spliced into a larger string: quotes removed, variables
    /// dereferenced.
    pub fn bare(&self) -> String {
        match self {
            Self::Literal(literal) => strip_quotes(&literal.value).to_string(),
            Self::Variable(variable) => variable.value(),
            Self::ReturnOption(option) => option.button.to_string(),
            Self::Null => format!("${{{}}}", NULL_DEFINE),
        }
    }

    /// Unquoted text of a literal; `None` for anything resolved at runtime.
    pub fn literal_text(&self) -> Option<&str> {
        match self {
            Self::Literal(literal) => Some(strip_quotes(&literal.value)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    None,
    And,
    Or,
}

/// Keyword that opens one conditional-macro line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareKeyword {
    If,
    ElseIf,
    And,
    Or,
    While,
    Until,
}

impl CompareKeyword {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "if" => Some(Self::If),
            "elseif" => Some(Self::ElseIf),
            "and" => Some(Self::And),
            "or" => Some(Self::Or),
            "while" => Some(Self::While),
            "until" => Some(Self::Until),
            _ => None,
        }
    }

    pub fn macro_name(self) -> &'static str {
        match self {
            Self::If => "If",
            Self::ElseIf => "ElseIf",
            Self::And => "AndIf",
            Self::Or => "OrIf",
            Self::While => "While",
            Self::Until => "Until",
        }
    }

    pub fn connective(self) -> Connective {
        match self {
            Self::And => Connective::And,
            Self::Or => Connective::Or,
            _ => Connective::None,
        }
    }
}

/// One compiled predicate. A comparison operator always comes with its
/// right operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonStatement {
    keyword: CompareKeyword,
    not: bool,
    left: Vec<Operand>,
    comparison: Option<(String, Operand)>,
}

impl ComparisonStatement {
    pub fn new(keyword: CompareKeyword) -> Self {
        Self {
            keyword,
            not: false,
            left: Vec::new(),
            comparison: None,
        }
    }

    pub fn keyword(&self) -> CompareKeyword {
        self.keyword
    }

    pub fn connective(&self) -> Connective {
        self.keyword.connective()
    }

    pub fn is_not(&self) -> bool {
        self.not
    }

    pub fn set_not(&mut self) {
        self.not = true;
    }

    pub fn left(&self) -> &[Operand] {
        &self.left
    }

    pub fn add_left(&mut self, operand: Operand) {
        self.left.push(operand);
    }

    pub fn comparison(&self) -> Option<(&str, &Operand)> {
        self.comparison
            .as_ref()
            .map(|(op, right)| (op.as_str(), right))
    }

    pub fn set_comparison(&mut self, op: impl Into<String>, right: Operand) {
        self.comparison = Some((op.into(), right));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::word::WordKind;

    #[test]
    fn bare_strips_quotes() {
        let word = Word::new(WordKind::String, "\"abc\"");
        let operand = Operand::from_word(&word);
        assert_eq!(operand.value(), "\"abc\"");
        assert_eq!(operand.bare(), "abc");
        assert_eq!(operand.literal_text(), Some("abc"));
    }

    #[test]
    fn null_placeholder() {
        assert!(Operand::Null.is_null());
        assert_eq!(Operand::Null.value(), "\"${BRIDLE_NULL}\"");
        assert_eq!(Operand::Null.literal_text(), None);
    }

    #[test]
    fn connectives() {
        assert_eq!(CompareKeyword::If.connective(), Connective::None);
        assert_eq!(CompareKeyword::And.connective(), Connective::And);
        assert_eq!(CompareKeyword::Or.connective(), Connective::Or);
    }
}
