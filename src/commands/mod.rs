pub mod attach;
pub mod bundle;
pub mod check;
pub mod children;
pub mod init;
pub mod mapping;
pub mod pull;
pub mod push;
pub mod update;

use std::io::{self, Write};

use crate::error::Result;

/// Print `label`, read one line from stdin and return it trimmed.
pub(crate) fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// `[Y/n]` question; an empty answer means yes.
pub(crate) fn confirm(question: &str) -> Result<bool> {
    let answer = prompt(&format!("{question} [Y/n] "))?;
    Ok(answer.is_empty() || answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
}
