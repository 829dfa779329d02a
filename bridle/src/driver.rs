//! File-level driver: reads sources, compiles them statement by statement,
//! follows `!include` and writes the generated scripts.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::info;

use crate::compiler::{Compiled, StatementCompiler};
use crate::error::{CompileError, DriverError, SourceError};
use crate::statements::{self, NEWLINE};
use crate::word::{InputReader, WordStream};

const BOM: u16 = 0xFEFF;

/// Text encoding of both the input and the generated files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    #[default]
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "utf-16le" | "utf16le" => Ok(Self::Utf16Le),
            "utf-16be" | "utf16be" => Ok(Self::Utf16Be),
            _ => Err(format!("unsupported encoding '{}'", s)),
        }
    }
}

impl Encoding {
    /// Decodes `bytes`, dropping a leading byte-order mark.
    pub fn decode(self, bytes: &[u8]) -> io::Result<String> {
        let invalid = |err: String| io::Error::new(io::ErrorKind::InvalidData, err);
        match self {
            Self::Utf8 => {
                let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
                String::from_utf8(bytes.to_vec())
                    .map_err(|err| invalid(err.to_string()))
            }
            Self::Utf16Le | Self::Utf16Be => {
                if bytes.len() % 2 != 0 {
                    let message = "odd number of bytes in UTF-16 input";
                    return Err(invalid(message.to_string()));
                }
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| {
                        let pair = [pair[0], pair[1]];
                        match self {
                            Self::Utf16Le => u16::from_le_bytes(pair),
                            _ => u16::from_be_bytes(pair),
                        }
                    })
                    .collect();
                let units = units.strip_prefix(&[BOM]).unwrap_or(&units);
                String::from_utf16(units).map_err(|err| invalid(err.to_string()))
            }
        }
    }

    /// UTF-16 output starts with a byte-order mark.
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            Self::Utf8 => text.as_bytes().to_vec(),
            Self::Utf16Le => std::iter::once(BOM)
                .chain(text.encode_utf16())
                .flat_map(u16::to_le_bytes)
                .collect(),
            Self::Utf16Be => std::iter::once(BOM)
                .chain(text.encode_utf16())
                .flat_map(u16::to_be_bytes)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DriverOptions {
    /// Directory include paths are resolved against.
    pub base_dir: PathBuf,
    /// Directory generated include files are written to.
    pub out_dir: PathBuf,
    pub encoding: Encoding,
    /// Include files copied instead of compiled.
    pub exclude: Vec<PathBuf>,
}

/// `setup.nsi` -> `setup.bridle.nsi`
pub fn bridle_file_name(name: &str) -> String {
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file = match path.extension() {
        Some(ext) => format!("{}.bridle.{}", stem, ext.to_string_lossy()),
        None => format!("{}.bridle", stem),
    };
    path.with_file_name(file).to_string_lossy().into_owned()
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> DriverError + '_ {
    move |source| DriverError::Io {
        path: path.to_path_buf(),
        source,
    }
}

pub struct Driver {
    options: DriverOptions,
    compiler: StatementCompiler,
    /// Canonical paths of the files being compiled, outermost first.
    active: Vec<PathBuf>,
    file_count: usize,
    input_lines: usize,
}

impl Driver {
    pub fn new(options: DriverOptions) -> Self {
        Self::with_compiler(options, StatementCompiler::default())
    }

    pub fn with_compiler(
        options: DriverOptions,
        compiler: StatementCompiler,
    ) -> Self {
        Self {
            options,
            compiler,
            active: Vec::new(),
            file_count: 0,
            input_lines: 0,
        }
    }

    /// Source files compiled so far, includes counted.
    pub fn file_count(&self) -> usize {
        self.file_count
    }

    pub fn input_lines(&self) -> usize {
        self.input_lines
    }

    /// Compiles `input` (relative to the base directory) into `output`,
    /// which gets the prelude.
    pub fn compile(&mut self, input: &str, output: &Path) -> Result<(), DriverError> {
        let input = self.options.base_dir.join(input);
        info!("Begin compiling file: {}", input.display());
        let mut text = statements::prelude();
        text.push_str(NEWLINE);
        self.compile_file(&input, &mut text)?;
        info!("Output file: {}", output.display());
        self.write(output, &text)
    }

    fn compile_file(&mut self, path: &Path, out: &mut String) -> Result<(), DriverError> {
        let bytes = fs::read(path).map_err(io_error(path))?;
        let source = self
            .options
            .encoding
            .decode(&bytes)
            .map_err(io_error(path))?;
        self.file_count += 1;

        self.active
            .push(fs::canonicalize(path).map_err(io_error(path))?);
        let result = self.compile_source(path, &source, out);
        self.active.pop();
        result
    }

    fn compile_source(
        &mut self,
        path: &Path,
        source: &str,
        out: &mut String,
    ) -> Result<(), DriverError> {
        let mut reader = InputReader::new(source, path.display().to_string());
        let located = |reader: &InputReader, error: CompileError| SourceError {
            path: path.to_path_buf(),
            line: reader.lines_read(),
            error,
        };
        loop {
            match reader.go_to_next_statement() {
                Ok(true) => {}
                Ok(false) => break,
                Err(error) => return Err(located(&reader, error).into()),
            }
            let compiled = self
                .compiler
                .compile_statement(&mut reader)
                .map_err(|error| located(&reader, error))?;
            let text = match compiled {
                Compiled::Text(text) => text,
                Compiled::Include { indent, path: name } => {
                    self.include(&indent, &name, path, &reader)?
                }
            };
            out.push_str(&text);
            out.push_str(NEWLINE);
        }

        info!(
            "End compiling {} lines in file {}",
            reader.lines_read(),
            path.display()
        );
        self.input_lines += reader.lines_read();
        Ok(())
    }

    fn is_excluded(&self, name: &str, path: &Path) -> bool {
        self.options
            .exclude
            .iter()
            .any(|excluded| excluded == Path::new(name) || excluded == path)
    }

    fn include(
        &mut self,
        indent: &str,
        name: &str,
        from: &Path,
        reader: &InputReader,
    ) -> Result<String, DriverError> {
        let input = self.options.base_dir.join(name);
        let output_name = bridle_file_name(name);
        let output = self.options.out_dir.join(&output_name);

        if self.is_excluded(name, &input) {
            info!(
                "Include file '{}' is excluded, copying it to {}",
                name,
                output.display()
            );
            self.prepare_parent(&output)?;
            fs::copy(&input, &output).map_err(io_error(&input))?;
            Ok(statements::include(indent, &output_name))
        } else if !input.exists() {
            info!(
                "Include file '{}' not found, assuming the target compiler finds it",
                name
            );
            Ok(reader.current_statement().to_string())
        } else {
            let canonical = fs::canonicalize(&input).map_err(io_error(&input))?;
            if self.active.contains(&canonical) {
                return Err(SourceError {
                    path: from.to_path_buf(),
                    line: reader.lines_read(),
                    error: CompileError::semantic(format!(
                        "recursive include of '{}'",
                        name
                    )),
                }
                .into());
            }
            info!("Follow include: {}", input.display());
            let mut text = String::new();
            self.compile_file(&input, &mut text)?;
            self.write(&output, &text)?;
            Ok(statements::include(indent, &output_name))
        }
    }

    fn prepare_parent(&self, path: &Path) -> Result<(), DriverError> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent).map_err(io_error(parent))
            }
            _ => Ok(()),
        }
    }

    fn write(&self, path: &Path, text: &str) -> Result<(), DriverError> {
        self.prepare_parent(path)?;
        fs::write(path, self.options.encoding.encode(text)).map_err(io_error(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("bridle-driver-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).expect("create scratch dir");
        dir
    }

    fn options(dir: &Path) -> DriverOptions {
        DriverOptions {
            base_dir: dir.to_path_buf(),
            out_dir: dir.to_path_buf(),
            ..DriverOptions::default()
        }
    }

    #[test]
    fn test_bridle_file_name() {
        assert_eq!(bridle_file_name("setup.nsi"), "setup.bridle.nsi");
        assert_eq!(bridle_file_name("lib/util.nsh"), "lib/util.bridle.nsh");
        assert_eq!(bridle_file_name("README"), "README.bridle");
    }

    #[test]
    fn test_encoding_names() {
        assert_eq!("UTF-8".parse::<Encoding>(), Ok(Encoding::Utf8));
        assert_eq!("utf-16le".parse::<Encoding>(), Ok(Encoding::Utf16Le));
        assert_eq!("UTF-16BE".parse::<Encoding>(), Ok(Encoding::Utf16Be));
        assert!("latin1".parse::<Encoding>().is_err());
    }

    #[test]
    fn test_utf16_has_bom() {
        let bytes = Encoding::Utf16Le.encode("A");
        assert_eq!(bytes, vec![0xFF, 0xFE, b'A', 0]);
        let bytes = Encoding::Utf16Be.encode("A");
        assert_eq!(bytes, vec![0xFE, 0xFF, 0, b'A']);
        assert_eq!(Encoding::Utf16Be.decode(&bytes).unwrap(), "A");
        assert!(Encoding::Utf16Le.decode(&[0x41]).is_err());
    }

    #[test]
    fn test_compile_writes_prelude_and_counts() {
        let dir = scratch_dir("prelude");
        fs::write(dir.join("main.nsi"), "x = 1\r\nDetailPrint(x)\r\n").unwrap();
        let mut driver = Driver::new(options(&dir));
        let output = dir.join("main.bridle.nsi");
        driver.compile("main.nsi", &output).unwrap();

        let text = fs::read_to_string(&output).unwrap();
        assert!(text.starts_with("!include \"LogicLib.nsh\"\r\n"));
        assert!(text.ends_with("Var /GLOBAL x\r\nStrCpy $x 1\r\nDetailPrint $x\r\n"));
        assert_eq!(driver.file_count(), 1);
        assert_eq!(driver.input_lines(), 2);
    }

    #[test]
    fn test_include_shares_environment() {
        let dir = scratch_dir("include");
        fs::write(dir.join("lib.nsh"), "Var shared\n").unwrap();
        fs::write(
            dir.join("main.nsi"),
            "!include \"lib.nsh\"\n!include \"missing.nsh\"\nshared = 1\n",
        )
        .unwrap();
        let mut driver = Driver::new(options(&dir));
        let output = dir.join("out.nsi");
        driver.compile("main.nsi", &output).unwrap();

        let text = fs::read_to_string(&output).unwrap();
        assert!(text.contains("!include \"lib.bridle.nsh\"\r\n"));
        assert!(text.contains("!include \"missing.nsh\"\r\n"));
        assert!(text.contains("StrCpy $shared 1"));
        assert!(!text.contains("Var /GLOBAL shared"));
        let lib = fs::read_to_string(dir.join("lib.bridle.nsh")).unwrap();
        assert_eq!(lib, "Var /GLOBAL shared\r\n");
        assert_eq!(driver.file_count(), 2);
    }

    #[test]
    fn test_excluded_include_is_copied() {
        let dir = scratch_dir("exclude");
        let out_dir = dir.join("out");
        fs::write(dir.join("raw.nsh"), "x = this is not bridle (\n").unwrap();
        fs::write(dir.join("main.nsi"), "!include \"raw.nsh\"\n").unwrap();
        let mut driver = Driver::new(DriverOptions {
            out_dir: out_dir.clone(),
            exclude: vec![PathBuf::from("raw.nsh")],
            ..options(&dir)
        });
        driver.compile("main.nsi", &out_dir.join("main.nsi")).unwrap();
        let copied = fs::read_to_string(out_dir.join("raw.bridle.nsh")).unwrap();
        assert_eq!(copied, "x = this is not bridle (\n");
    }

    #[test]
    fn test_errors_carry_location() {
        let dir = scratch_dir("error");
        fs::write(dir.join("bad.nsi"), "; fine\nx = nope\n").unwrap();
        let mut driver = Driver::new(options(&dir));
        let err = driver.compile("bad.nsi", &dir.join("bad.out")).unwrap_err();
        match err {
            DriverError::Source(err) => {
                assert_eq!(err.line, 2);
                assert!(matches!(err.error, CompileError::UndefinedVariable { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_include_cycle_is_an_error() {
        let dir = scratch_dir("cycle");
        fs::write(dir.join("a.nsh"), "; self\n!include \"a.nsh\"\n").unwrap();
        let mut driver = Driver::new(options(&dir));
        let err = driver.compile("a.nsh", &dir.join("a.out")).unwrap_err();
        match err {
            DriverError::Source(err) => {
                assert_eq!(err.line, 2);
                assert!(err.error.to_string().contains("recursive include"));
            }
            other => panic!("unexpected error: {other}"),
        }

        fs::write(dir.join("main.nsi"), "!include \"b.nsh\"\n").unwrap();
        fs::write(dir.join("b.nsh"), "!include \"c.nsh\"\n").unwrap();
        fs::write(dir.join("c.nsh"), "!include \"b.nsh\"\n").unwrap();
        let mut driver = Driver::new(options(&dir));
        let err = driver.compile("main.nsi", &dir.join("main.out")).unwrap_err();
        match err {
            DriverError::Source(err) => {
                assert!(err.path.ends_with("c.nsh"));
                assert_eq!(err.error.kind(), crate::error::ErrorKind::Semantic);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_same_include_twice_is_not_a_cycle() {
        let dir = scratch_dir("twice");
        fs::write(dir.join("lib.nsh"), "; nothing\n").unwrap();
        fs::write(
            dir.join("main.nsi"),
            "!include \"lib.nsh\"\n!include \"lib.nsh\"\n",
        )
        .unwrap();
        let mut driver = Driver::new(options(&dir));
        driver.compile("main.nsi", &dir.join("main.out")).unwrap();
        assert_eq!(driver.file_count(), 3);
    }

    #[test]
    fn test_missing_input_is_io_error() {
        let dir = scratch_dir("missing");
        let mut driver = Driver::new(options(&dir));
        let err = driver.compile("nope.nsi", &dir.join("out.nsi")).unwrap_err();
        assert!(matches!(err, DriverError::Io { .. }));
    }
}
