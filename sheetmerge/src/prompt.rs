//! Interactive prompts on stdin

use anyhow::{Result, bail};
use std::io::{self, BufRead, Write};

/// Ask a question and return whether the answer is exactly `Y`
pub fn confirm(question: &str) -> Result<bool> {
    let stdin = io::stdin();
    confirm_from(&mut stdin.lock(), &mut io::stdout(), question)
}

/// Ask until a non-blank answer is given
pub fn non_blank(question: &str) -> Result<String> {
    let stdin = io::stdin();
    non_blank_from(&mut stdin.lock(), &mut io::stdout(), question)
}

fn read_answer<R: BufRead, W: Write>(input: &mut R, out: &mut W, question: &str) -> Result<Option<String>> {
    write!(out, "{}", question)?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn confirm_from<R: BufRead, W: Write>(input: &mut R, out: &mut W, question: &str) -> Result<bool> {
    Ok(read_answer(input, out, question)?.as_deref() == Some("Y"))
}

fn non_blank_from<R: BufRead, W: Write>(input: &mut R, out: &mut W, question: &str) -> Result<String> {
    loop {
        match read_answer(input, out, question)? {
            Some(answer) if !answer.trim().is_empty() => return Ok(answer),
            Some(_) => writeln!(out)?,
            None => bail!("No destination file name given"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_confirm() {
        let mut out = Vec::new();
        assert!(confirm_from(&mut Cursor::new("Y\n"), &mut out, "? ").unwrap());
        assert!(!confirm_from(&mut Cursor::new("y\n"), &mut out, "? ").unwrap());
        assert!(!confirm_from(&mut Cursor::new("yes\n"), &mut out, "? ").unwrap());
        assert!(!confirm_from(&mut Cursor::new(""), &mut out, "? ").unwrap());
    }

    #[test]
    fn test_non_blank_reasks() {
        let mut out = Vec::new();
        let answer = non_blank_from(&mut Cursor::new("\n   \nmaster\n"), &mut out, "name: ").unwrap();
        assert_eq!(answer, "master");
        assert_eq!(String::from_utf8(out).unwrap().matches("name: ").count(), 3);
    }

    #[test]
    fn test_non_blank_eof() {
        let mut out = Vec::new();
        assert!(non_blank_from(&mut Cursor::new("\n"), &mut out, "name: ").is_err());
    }
}
