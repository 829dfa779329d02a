use bridle::{
    CompileError, Compiled, ErrorKind, InputReader, NEWLINE, StatementCompiler,
};

fn compile(source: &str) -> Result<Vec<String>, CompileError> {
    let mut compiler = StatementCompiler::default();
    let mut reader = InputReader::new(source, "program.nsi");
    let mut lines = Vec::new();
    while reader.go_to_next_statement()? {
        match compiler.compile_statement(&mut reader)? {
            Compiled::Text(text) => {
                lines.extend(text.split(NEWLINE).map(str::to_string))
            }
            Compiled::Include { path, .. } => lines.push(format!("include {path}")),
        }
    }
    Ok(lines)
}

const INSTALLER: &str = r#"
Name "Demo"
OutFile "demo.exe"

Function Greet(who)
    Var message
    message = "Hello, " & who & "!"
    If who == ""
        Return "nobody"
    EndIf
    DetailPrint(message)
    Return message
FunctionEnd

Section "Main"
    SetOutPath $INSTDIR
    greeting = Greet("World")
    answer = MsgBox("YESNO", greeting, "ICONQUESTION", "YES")
    If answer == "NO"
        Abort()
    EndIf
    ok = CopyFiles("$EXEDIR\data.bin", $INSTDIR)
    args = GetParameters()
    counter = 0
    Do While counter < 3
        counter = IntOp(counter, "+", 1)
    Loop
SectionEnd
"#;

#[test]
fn installer_compiles() {
    let lines = compile(INSTALLER).expect("installer compiles");

    let expect = [
        "Name \"Demo\"",
        "Var /GLOBAL greet.who",
        "Function Greet",
        "    Pop $greet.who",
        "    Var /GLOBAL greet.message",
        "    StrCpy $greet.message \"Hello, $greet.who!\"",
        "    ${If} $greet.who == \"\"",
        "        StrCpy $bridle_return \"nobody\"",
        "    DetailPrint $greet.message",
        "    StrCpy $bridle_return $greet.message",
        "FunctionEnd",
        "    SetOutPath $INSTDIR",
        "    Call Greet",
        "    StrCpy $greeting $bridle_return",
        "    MessageBox MB_YESNO|MB_ICONQUESTION $greeting /SD IDYES IDNO msgbox_bridle_2",
        "        Abort",
        "    StrCpy $ok 1",
        "    CopyFiles \"$EXEDIR\\data.bin\" $INSTDIR",
        "    ${GetParameters} $args",
        "    ${DoWhile} $counter < 3",
        "        IntOp $counter $counter \"+\" 1",
        "    ${Loop}",
    ];
    for line in expect {
        assert!(
            lines.iter().any(|l| l == line),
            "missing line {line:?} in:\n{}",
            lines.join("\n")
        );
    }

    // The return register is declared exactly once.
    let declarations = lines
        .iter()
        .filter(|l| l.trim() == "Var /GLOBAL bridle_return")
        .count();
    assert_eq!(declarations, 1);
}

#[test]
fn statements_keep_their_order() {
    let lines = compile("a = 1\nb = a & \"x\"\nDetailPrint(b)").unwrap();
    assert_eq!(
        lines,
        vec![
            "Var /GLOBAL a",
            "StrCpy $a 1",
            "Var /GLOBAL b",
            "StrCpy $b \"$ax\"",
            "DetailPrint $b",
        ]
    );
}

#[test]
fn nested_calls_as_arguments() {
    let lines =
        compile("DetailPrint(GetFileName(GetParent(\"C:\\a\\b.txt\")) & \"!\")")
            .unwrap();
    assert_eq!(
        lines,
        vec![
            "Var /GLOBAL bridle_1",
            "Var /GLOBAL bridle_2",
            "${GetParent} \"C:\\a\\b.txt\" $bridle_2",
            "${GetFileName} $bridle_2 $bridle_1",
            "DetailPrint \"$bridle_1!\"",
        ]
    );
}

#[test]
fn forward_call_then_declaration() {
    let lines = compile(
        "Setup(1)\n\
         Function Setup(level)\n\
         FunctionEnd",
    )
    .unwrap();
    assert_eq!(lines[..2], ["Push 1", "Call Setup"]);

    let err = compile(
        "Setup(1)\n\
         Function Setup(level, mode)\n\
         FunctionEnd",
    )
    .unwrap_err();
    assert!(matches!(
        err,
        CompileError::TooFewArguments { expected: 2, provided: 1, .. }
    ));
}

#[test]
fn errors_are_classified() {
    let syntax = compile("If").unwrap_err();
    assert_eq!(syntax.kind(), ErrorKind::Syntax);

    let semantic = compile("x = missing").unwrap_err();
    assert_eq!(semantic.kind(), ErrorKind::Semantic);

    let semantic = compile("r = MsgBox(\"MAYBE\", \"?\")").unwrap_err();
    assert_eq!(semantic.kind(), ErrorKind::Semantic);
}

#[test]
fn comments_and_blocks_pass_through() {
    let lines = compile(
        "/* block\n\
         still block */\n\
         # hash comment\n\
         Var x ; trailing",
    )
    .unwrap();
    assert_eq!(
        lines,
        vec![
            "/* block",
            "still block */",
            "# hash comment",
            "Var /GLOBAL x",
        ]
    );
}
