//! Interactive input on the terminal. Prompts go to stderr so stdout stays
//! machine-readable.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

pub fn line(label: &str) -> Result<String> {
    eprint!("{}", label);
    io::stderr().flush()?;

    let mut input = String::new();
    io::stdin()
        .lock()
        .read_line(&mut input)
        .context("Failed to read input")?;
    Ok(input.trim().to_string())
}

/// Empty input means "not given".
pub fn optional_line(label: &str) -> Result<Option<String>> {
    let value = line(label)?;
    Ok(if value.is_empty() { None } else { Some(value) })
}

pub fn password(label: &str) -> Result<String> {
    rpassword::prompt_password(label).context("Failed to read password")
}

/// Ask twice; mismatches are rejected here, before any validation or
/// network call.
pub fn confirmed_password() -> Result<String> {
    let first = password("Password: ")?;
    let second = password("Confirm password: ")?;
    if first != second {
        return Err(anyhow::anyhow!("Passwords do not match"));
    }
    Ok(first)
}
