use crate::callable::{Builtin, Custom};

use crate::callable::Convention::{ErrorFlag, Optional, Required, Void};

/// Predefined target variables: source name, target name.
pub const VARIABLES: &[(&str, &str)] = &[
    ("r0", "R0"),
    ("r1", "R1"),
    ("r2", "R2"),
    ("r3", "R3"),
    ("r4", "R4"),
    ("r5", "R5"),
    ("r6", "R6"),
    ("r7", "R7"),
    ("r8", "R8"),
    ("r9", "R9"),
    ("instdir", "INSTDIR"),
    ("outdir", "OUTDIR"),
    ("cmdline", "CMDLINE"),
    ("language", "LANGUAGE"),
    ("pluginsdir", "PLUGINSDIR"),
    ("exedir", "EXEDIR"),
    ("temp", "TEMP"),
];

// name, min args, max args, convention, result slot
pub const INSTRUCTIONS: &[Builtin] = &[
    Builtin::instruction("Abort", 0, 1, Void, 0),
    Builtin::instruction("ClearErrors", 0, 0, Void, 0),
    Builtin::instruction("CopyFiles", 2, 2, ErrorFlag, 0),
    Builtin::instruction("CreateDirectory", 1, 1, ErrorFlag, 0),
    Builtin::instruction("CreateShortCut", 2, 8, ErrorFlag, 0),
    Builtin::instruction("Delete", 1, 1, ErrorFlag, 0),
    Builtin::instruction("DeleteRegKey", 2, 2, ErrorFlag, 0),
    Builtin::instruction("DeleteRegValue", 3, 3, ErrorFlag, 0),
    Builtin::instruction("DetailPrint", 1, 1, Void, 0),
    Builtin::instruction("Exec", 1, 1, ErrorFlag, 0),
    Builtin::instruction("ExecShell", 2, 3, ErrorFlag, 0),
    Builtin::instruction("ExecWait", 1, 1, Optional, 1),
    Builtin::instruction("ExpandEnvStrings", 1, 1, Required, 0),
    Builtin::instruction("FileClose", 1, 1, Void, 0),
    Builtin::instruction("FileOpen", 2, 2, Required, 0),
    Builtin::instruction("FileRead", 1, 2, Required, 1),
    Builtin::instruction("FileWrite", 2, 2, ErrorFlag, 0),
    Builtin::instruction("GetFullPathName", 1, 1, Required, 0),
    Builtin::instruction("GetTempFileName", 0, 1, Required, 0),
    Builtin::instruction("IntFmt", 2, 2, Required, 0),
    Builtin::instruction("IntOp", 2, 3, Required, 0),
    Builtin::instruction("Quit", 0, 0, Void, 0),
    Builtin::instruction("ReadEnvStr", 1, 1, Required, 0),
    Builtin::instruction("ReadINIStr", 3, 3, Required, 0),
    Builtin::instruction("ReadRegDWORD", 3, 3, Required, 0),
    Builtin::instruction("ReadRegStr", 3, 3, Required, 0),
    Builtin::instruction("Reboot", 0, 0, Void, 0),
    Builtin::instruction("Rename", 2, 2, ErrorFlag, 0),
    Builtin::instruction("RMDir", 1, 1, ErrorFlag, 0),
    Builtin::instruction("SearchPath", 1, 1, Required, 0),
    Builtin::instruction("SetErrors", 0, 0, Void, 0),
    Builtin::instruction("SetOutPath", 1, 1, Void, 0),
    Builtin::instruction("SetShellVarContext", 1, 1, Void, 0),
    Builtin::instruction("Sleep", 1, 1, Void, 0),
    Builtin::instruction("StrCpy", 1, 3, Required, 0),
    Builtin::instruction("StrLen", 1, 1, Required, 0),
    Builtin::instruction("WriteINIStr", 4, 4, ErrorFlag, 0),
    Builtin::instruction("WriteRegDWORD", 4, 4, ErrorFlag, 0),
    Builtin::instruction("WriteRegStr", 4, 4, ErrorFlag, 0),
    Builtin::instruction("WriteUninstaller", 1, 1, Void, 0),
];

/// `FileFunc.nsh` macros.
pub const HEADERS: &[Builtin] = &[
    Builtin::header("GetBaseName", 1, 1),
    Builtin::header("GetExePath", 0, 0),
    Builtin::header("GetFileExt", 1, 1),
    Builtin::header("GetFileName", 1, 1),
    Builtin::header("GetOptions", 2, 2),
    Builtin::header("GetParameters", 0, 0),
    Builtin::header("GetParent", 1, 1),
];

pub const CUSTOM: &[Custom] = &[Custom::MsgBox];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callable::BuiltinStyle;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let mut seen = HashSet::new();
        for builtin in INSTRUCTIONS.iter().chain(HEADERS) {
            let callable = crate::callable::Callable::Builtin(*builtin);
            assert!(seen.insert(callable.name().to_lowercase()));
        }
    }

    #[test]
    fn test_headers_use_macro_style() {
        assert!(HEADERS.iter().all(|h| h.style() == BuiltinStyle::Header));
        assert!(
            INSTRUCTIONS
                .iter()
                .all(|i| i.style() == BuiltinStyle::Instruction)
        );
    }
}
