use std::io::{self, BufRead, StderrLock, StdinLock, Write};

use error_stack::{Result, ResultExt};
use serde::Serialize;
use tracing::debug;

use crate::printer;
use crate::Error;

const PROMPT: &str = "confirm transaction before signing and broadcasting [y/N]: ";

/// How a built transaction is handled, resolved once from the command line flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Print the unsigned transaction and stop.
    GenerateOnly,
    SkipConfirmation,
    Interactive,
}

impl Mode {
    pub fn new(generate_only: bool, skip_confirmation: bool) -> Self {
        match (generate_only, skip_confirmation) {
            (true, _) => Mode::GenerateOnly,
            (false, true) => Mode::SkipConfirmation,
            (false, false) => Mode::Interactive,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Printed,
    Proceed,
    Canceled,
}

pub trait Prompt {
    /// Shows the transaction to the user and returns whether they confirmed it.
    fn confirm(&mut self, tx: &str) -> bool;
}

pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
}

impl<R, W> TerminalPrompt<R, W>
where
    R: BufRead,
    W: Write,
{
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    #[cfg(test)]
    pub fn output(&self) -> &W {
        &self.output
    }
}

impl TerminalPrompt<StdinLock<'static>, StderrLock<'static>> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr().lock())
    }
}

impl<R, W> Prompt for TerminalPrompt<R, W>
where
    R: BufRead,
    W: Write,
{
    fn confirm(&mut self, tx: &str) -> bool {
        if writeln!(self.output, "{tx}\n")
            .and_then(|_| write!(self.output, "{PROMPT}"))
            .and_then(|_| self.output.flush())
            .is_err()
        {
            return false;
        }

        let mut answer = String::new();
        match self.input.read_line(&mut answer) {
            Ok(_) => answer.trim_start().starts_with(['y', 'Y']),
            Err(err) => {
                debug!(err = %err, "failed to read confirmation");
                false
            }
        }
    }
}

/// Decides what happens to a built transaction. Nothing is broadcast unless the verdict is
/// [`Verdict::Proceed`].
pub fn gate<T, W, P>(mode: Mode, tx: &T, out: &mut W, prompt: &mut P) -> Result<Verdict, Error>
where
    T: Serialize,
    W: Write,
    P: Prompt,
{
    match mode {
        Mode::GenerateOnly => {
            printer::print(out, tx)?;
            Ok(Verdict::Printed)
        }
        Mode::SkipConfirmation => Ok(Verdict::Proceed),
        Mode::Interactive => {
            let text = serde_json::to_string(tx).change_context(Error::Output)?;

            if prompt.confirm(&text) {
                Ok(Verdict::Proceed)
            } else {
                Ok(Verdict::Canceled)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, BufRead, Cursor, Read};

    use serde_json::json;

    use super::{gate, Mode, Prompt, TerminalPrompt, Verdict, PROMPT};

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("stdin closed"))
        }
    }

    impl BufRead for FailingReader {
        fn fill_buf(&mut self) -> io::Result<&[u8]> {
            Err(io::Error::other("stdin closed"))
        }

        fn consume(&mut self, _: usize) {}
    }

    fn answer(input: &str) -> (Verdict, String, Vec<u8>) {
        let mut prompt = TerminalPrompt::new(Cursor::new(input.to_string()), Vec::new());
        let mut out = Vec::new();

        let verdict = gate(
            Mode::Interactive,
            &json!({"body": {}}),
            &mut out,
            &mut prompt,
        )
        .unwrap();

        (
            verdict,
            String::from_utf8(prompt.output).unwrap(),
            out,
        )
    }

    #[test]
    fn mode_prefers_generate_only() {
        assert_eq!(Mode::new(true, true), Mode::GenerateOnly);
        assert_eq!(Mode::new(true, false), Mode::GenerateOnly);
        assert_eq!(Mode::new(false, true), Mode::SkipConfirmation);
        assert_eq!(Mode::new(false, false), Mode::Interactive);
    }

    #[test]
    fn interactive_confirms_on_yes() {
        for input in ["y\n", "Y\n", "yes\n", "Yep", "  y\n"] {
            let (verdict, prompted, out) = answer(input);

            assert_eq!(verdict, Verdict::Proceed, "{input:?}");
            assert_eq!(prompted, format!("{{\"body\":{{}}}}\n\n{PROMPT}"));
            assert!(out.is_empty());
        }
    }

    #[test]
    fn interactive_cancels_on_anything_else() {
        for input in ["n\n", "no\n", "\n", "", "sure\n", "1\n"] {
            let (verdict, _, out) = answer(input);

            assert_eq!(verdict, Verdict::Canceled, "{input:?}");
            assert!(out.is_empty());
        }
    }

    #[test]
    fn interactive_cancels_on_read_error() {
        let mut prompt = TerminalPrompt::new(FailingReader, Vec::new());

        assert!(!prompt.confirm("{}"));
    }

    #[test]
    fn generate_only_prints_without_prompting() {
        let mut prompt = TerminalPrompt::new(Cursor::new("y\n"), Vec::new());
        let mut out = Vec::new();

        let verdict = gate(Mode::GenerateOnly, &json!({"a": 1}), &mut out, &mut prompt).unwrap();

        assert_eq!(verdict, Verdict::Printed);
        assert_eq!(String::from_utf8(out).unwrap(), "{\"a\":1}\n");
        assert!(prompt.output.is_empty());
    }

    #[test]
    fn skip_confirmation_proceeds_silently() {
        let mut prompt = TerminalPrompt::new(Cursor::new(""), Vec::new());
        let mut out = Vec::new();

        let verdict = gate(Mode::SkipConfirmation, &json!({}), &mut out, &mut prompt).unwrap();

        assert_eq!(verdict, Verdict::Proceed);
        assert!(out.is_empty());
        assert!(prompt.output.is_empty());
    }
}
