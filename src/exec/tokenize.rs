// src/exec/tokenize.rs

//! Split a command string into an argument vector.
//!
//! Rules:
//! - Outside quotes, whitespace separates arguments.
//! - A `'` or `"` at the start of an argument opens a quoted group; the quote
//!   itself is removed. Inside the group whitespace and the *other* quote
//!   character are literal, and the matching quote closes the group.
//! - A quote in the middle of an argument is dropped and does not split it.
//! - An unterminated quote is closed by the end of the string.

/// Tokenize `command` into argv.
pub fn tokenize(command: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    // `true` once the current argument has begun (so `''` yields an empty arg).
    let mut started = false;
    let mut quote: Option<char> = None;

    for c in command.chars() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                } else {
                    current.push(c);
                }
            }
            None => {
                if c.is_whitespace() {
                    if started {
                        args.push(std::mem::take(&mut current));
                        started = false;
                    }
                } else if c == '\'' || c == '"' {
                    if !started {
                        quote = Some(c);
                        started = true;
                    }
                    // mid-token quote: dropped in place
                } else {
                    current.push(c);
                    started = true;
                }
            }
        }
    }

    if started {
        args.push(current);
    }

    args
}

/// Quote `arg` so that [`tokenize`] yields it back as a single argument.
///
/// Returns `None` when the argument contains both quote characters, which
/// the tokenizer has no way to express.
pub fn quote_arg(arg: &str) -> Option<String> {
    if !arg.contains('\'') {
        Some(format!("'{arg}'"))
    } else if !arg.contains('"') {
        Some(format!("\"{arg}\""))
    } else {
        None
    }
}
