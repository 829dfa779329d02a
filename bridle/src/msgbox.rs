//! `MsgBox(buttons, message [, options [, sd]])`
//!
//! Wraps the native `MessageBox` instruction and turns its per-button
//! jump targets into a button name assigned to the result variable.

use crate::environment::{NameGenerator, Variable};
use crate::error::{CompileError, Result};
use crate::operand::{Operand, ReturnOption};
use crate::statements::{self, DEFAULT_INDENT, NEWLINE};

pub const NAME: &str = "MsgBox";
pub const MIN_ARGS: usize = 2;
pub const MAX_ARGS: usize = 4;

const BUTTON_GROUP_INDEX: usize = 0;
const MESSAGE_INDEX: usize = 1;
const OPTIONS_INDEX: usize = 2;
const SD_RETURN_INDEX: usize = 3;

const GOTO_PREFIX: &str = "msgbox_";

const BUTTONS: [&str; 7] =
    ["OK", "CANCEL", "ABORT", "RETRY", "IGNORE", "YES", "NO"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonGroup {
    Ok,
    OkCancel,
    AbortRetryIgnore,
    RetryCancel,
    YesNo,
    YesNoCancel,
}

impl ButtonGroup {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "OK" => Some(Self::Ok),
            "OKCANCEL" => Some(Self::OkCancel),
            "ABORTRETRYIGNORE" => Some(Self::AbortRetryIgnore),
            "RETRYCANCEL" => Some(Self::RetryCancel),
            "YESNO" => Some(Self::YesNo),
            "YESNOCANCEL" => Some(Self::YesNoCancel),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::OkCancel => "OKCANCEL",
            Self::AbortRetryIgnore => "ABORTRETRYIGNORE",
            Self::RetryCancel => "RETRYCANCEL",
            Self::YesNo => "YESNO",
            Self::YesNoCancel => "YESNOCANCEL",
        }
    }

    /// Button the dialog falls through on.
    fn default_button(self) -> &'static str {
        match self {
            Self::Ok | Self::OkCancel => "OK",
            Self::RetryCancel | Self::AbortRetryIgnore => "RETRY",
            Self::YesNo | Self::YesNoCancel => "YES",
        }
    }

    /// Buttons that need their own jump target.
    fn jump_buttons(self) -> &'static [&'static str] {
        match self {
            Self::Ok => &[],
            Self::OkCancel | Self::RetryCancel => &["CANCEL"],
            Self::YesNo => &["NO"],
            Self::YesNoCancel => &["NO", "CANCEL"],
            Self::AbortRetryIgnore => &["ABORT", "IGNORE"],
        }
    }
}

/// `MB_<group>` followed by each `|`-separated option as `MB_<option>`.
pub fn options_list(group: ButtonGroup, options: Option<&str>) -> String {
    let mut out = format!("MB_{}", group.as_str());
    for option in options.unwrap_or("").split('|') {
        if !option.is_empty() {
            out.push_str("|MB_");
            out.push_str(option);
        }
    }
    out
}

static MISSING: Operand = Operand::Null;

fn argument(args: &[Operand], index: usize) -> &Operand {
    args.get(index).unwrap_or(&MISSING)
}

fn literal_argument<'a>(
    args: &'a [Operand],
    index: usize,
    what: &str,
) -> Result<Option<&'a str>> {
    let arg = argument(args, index);
    if arg.is_null() {
        return Ok(None);
    }
    match arg.literal_text() {
        Some(text) => Ok(Some(text)),
        None => Err(CompileError::semantic(format!(
            "{} {} must be a literal, got '{}'",
            NAME,
            what,
            arg.value()
        ))),
    }
}

pub(crate) fn statement_for(
    indent: &str,
    args: &[Operand],
    result: Option<&Variable>,
    names: &mut NameGenerator,
) -> Result<String> {
    let group_arg = literal_argument(args, BUTTON_GROUP_INDEX, "buttons")?;
    let group = group_arg
        .and_then(|name| ButtonGroup::parse(&name.to_uppercase()))
        .ok_or_else(|| {
            CompileError::semantic(format!(
                "Invalid button group argument '{}'",
                argument(args, BUTTON_GROUP_INDEX).value()
            ))
        })?;
    let options = literal_argument(args, OPTIONS_INDEX, "options")?;

    let mut out = format!(
        "{}MessageBox {} {}",
        indent,
        options_list(group, options),
        argument(args, MESSAGE_INDEX).value()
    );

    if let Some(button) = literal_argument(args, SD_RETURN_INDEX, "sd")? {
        let button = button.to_uppercase();
        if !BUTTONS.contains(&button.as_str()) {
            return Err(CompileError::semantic(format!(
                "Unsupported MsgBox SD return {}",
                button
            )));
        }
        out.push_str(" /SD ID");
        out.push_str(&button);
    }

    let Some(result) = result else {
        return Ok(out);
    };

    let exit = format!("{}{}", GOTO_PREFIX, names.generate());
    let options: Vec<ReturnOption> = group
        .jump_buttons()
        .iter()
        .map(|button| {
            ReturnOption::new(
                *button,
                format!("{}{}", GOTO_PREFIX, names.generate()),
            )
        })
        .collect();

    for option in &options {
        out.push_str(&format!(" {} {}", option.id(), option.label()));
    }

    let default = Operand::string(group.default_button());
    // Jump targets sit one level in, their bodies one level further.
    let inner = format!("{}{}", indent, DEFAULT_INDENT);
    let body = format!("{}{}", inner, DEFAULT_INDENT);
    let mut lines = vec![
        out,
        statements::variable_assign(&inner, result, &default),
        statements::goto(&inner, &exit),
    ];
    for option in options {
        lines.push(statements::label(&inner, option.label()));
        lines.push(statements::variable_assign(
            &body,
            result,
            &Operand::ReturnOption(option),
        ));
        lines.push(statements::goto(&body, &exit));
    }
    lines.push(statements::label(&inner, &exit));
    Ok(lines.join(NEWLINE))
}
