// src/convert/script.rs

//! Generation of the `/bin/sh` script that runs a conversion path.

use std::fmt::Write as _;
use std::path::Path;

use super::format::Formats;
use super::graph::ConversionPath;

const PREAMBLE: &str = r#"#!/bin/sh
rm_quiet() {
    rm -f -- "$1" 2>/dev/null || true
}

# Remove OUT and any numbered OUT.0, OUT.1, ... left by a failed step.
rm_outputs() {
    rm_quiet "$1"
    n=0
    while [ -e "$1.$n" ]; do
        rm_quiet "$1.$n"
        n=$((n + 1))
    done
}

# Some tools write OUT.0, OUT.1, ... instead of OUT (one file per page).
# Keep the first one under the expected name and drop the rest.
normalize_output() {
    [ -e "$1" ] && return 0
    [ -e "$1.0" ] || return 1
    mv -f -- "$1.0" "$1" || return 1
    n=1
    while [ -e "$1.$n" ]; do
        rm_quiet "$1.$n"
        n=$((n + 1))
    done
    return 0
}
"#;

/// A rendered conversion script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionScript {
    text: String,
}

impl ConversionScript {
    /// Script running every edge of `path` in order.
    ///
    /// Intermediate files are named `temp_base` plus the edge's target
    /// extension. The final intermediate is moved to `dest`. `source` is
    /// never deleted by the script.
    pub fn for_path(
        path: &ConversionPath,
        source: &Path,
        dest: &Path,
        temp_base: &Path,
        formats: &Formats,
    ) -> Self {
        let mut text = String::from(PREAMBLE);
        let source_str = source.to_string_lossy();
        let temp_base = temp_base.to_string_lossy();

        let mut infile = source_str.to_string();
        for (step, edge) in path.iter().enumerate() {
            let intermediate_input = step > 0;
            let ext = formats.extension(&edge.to).unwrap_or(&edge.to);
            let outfile = format!("{temp_base}.{ext}");

            let _ = writeln!(text);
            let _ = writeln!(text, "# step {}: {} -> {}", step + 1, edge.from, edge.to);
            let _ = writeln!(text, "infile={}", shell_quote(&infile));
            let _ = writeln!(text, "infile_base={}", shell_quote(&strip_extension(&infile)));
            let _ = writeln!(text, "outfile={}", shell_quote(&outfile));

            let cleanup_input = if intermediate_input {
                "    rm_quiet \"$infile\"\n"
            } else {
                ""
            };

            let _ = writeln!(text, "if ! ( {} ); then", substitute(&edge.command));
            let _ = writeln!(text, "    rm_outputs \"$outfile\"");
            text.push_str(cleanup_input);
            let _ = writeln!(text, "    exit 1");
            let _ = writeln!(text, "fi");

            let _ = writeln!(text, "if ! normalize_output \"$outfile\"; then");
            let _ = writeln!(text, "    rm_outputs \"$outfile\"");
            text.push_str(cleanup_input);
            let _ = writeln!(text, "    exit 1");
            let _ = writeln!(text, "fi");
            if intermediate_input {
                let _ = writeln!(text, "rm_quiet \"$infile\"");
            }

            infile = outfile;
        }

        let _ = writeln!(text);
        let _ = writeln!(
            text,
            "mv -f -- {} {} || exit 1",
            shell_quote(&infile),
            shell_quote(&dest.to_string_lossy())
        );
        let _ = writeln!(text, "exit 0");

        Self { text }
    }

    /// Script that copies `source` to `dest` unchanged, or moves it when
    /// `move_source` is set (the source is a temp file owned by the caller).
    pub fn for_copy(source: &Path, dest: &Path, move_source: bool) -> Self {
        let verb = if move_source { "mv" } else { "cp" };
        let text = format!(
            "#!/bin/sh\n{verb} -f -- {} {} || exit 1\nexit 0\n",
            shell_quote(&source.to_string_lossy()),
            shell_quote(&dest.to_string_lossy())
        );
        Self { text }
    }

    pub fn render(&self) -> &str {
        &self.text
    }
}

/// Replace the template tokens with references to the step variables.
fn substitute(template: &str) -> String {
    template
        .replace("$$i", "\"$infile\"")
        .replace("$$b", "\"$infile_base\"")
        .replace("$$o", "\"$outfile\"")
}

/// Single-quote `s` for `/bin/sh`.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

fn strip_extension(path: &str) -> String {
    let p = Path::new(path);
    match p.extension() {
        Some(_) => p.with_extension("").to_string_lossy().into_owned(),
        None => path.to_string(),
    }
}
