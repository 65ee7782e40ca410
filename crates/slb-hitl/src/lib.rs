use std::io::{self, BufRead, Write};

use slb_core::ClassifiedSnapshot;

pub const FALLBACK_QUESTION: &str = "Break their leases anyway? (y/n): ";

/// Context printed before the fallback question.
pub fn format_fallback_notice(locked_newer: &[ClassifiedSnapshot]) -> String {
    let mut s = format!("No snapshots older than cutoff, but {} are locked.\n", locked_newer.len());
    for c in locked_newer {
        s.push_str(&format!("- {} ({} / {})\n", c.id.as_str(), c.lease.status, c.lease.state));
    }
    s
}

/// Ask until the answer is one of y/yes/n/no (any case). End of input counts as no.
pub fn ask_yes_no<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> io::Result<bool> {
    loop {
        write!(output, "{question}")?;
        output.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            return Ok(false);
        }
        match line.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => writeln!(output, "Invalid. Enter 'y', 'yes', 'n' or 'no'.")?,
        }
    }
}

/// Ask until `validate` accepts the trimmed answer; its error text is shown on rejection.
pub fn prompt_until<R, W, T, F>(input: &mut R, output: &mut W, question: &str, validate: F) -> io::Result<T>
where
    R: BufRead,
    W: Write,
    F: Fn(&str) -> Result<T, String>,
{
    loop {
        write!(output, "{question}")?;
        output.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, format!("no answer for: {}", question.trim())));
        }
        match validate(line.trim()) {
            Ok(v) => return Ok(v),
            Err(msg) => writeln!(output, "{msg}")?,
        }
    }
}

/// Fallback confirmation: notice plus one yes/no question.
pub fn confirm_fallback<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    locked_newer: &[ClassifiedSnapshot],
) -> io::Result<bool> {
    write!(output, "\n{}", format_fallback_notice(locked_newer))?;
    let yes = ask_yes_no(input, output, FALLBACK_QUESTION)?;
    writeln!(output)?;
    Ok(yes)
}

/// [`confirm_fallback`] on stdin/stdout.
pub fn confirm_on_terminal(locked_newer: &[ClassifiedSnapshot]) -> io::Result<bool> {
    confirm_fallback(&mut io::stdin().lock(), &mut io::stdout(), locked_newer)
}

/// Read a secret without echo.
pub fn read_secret(prompt: &str) -> io::Result<String> {
    rpassword::prompt_password(prompt)
}
