//! Reply sanitization chokepoint.
//!
//! Models drift into roleplay: `(nervously)`, `*checks phone*`, double-spaced
//! paragraphs. Every backend reply goes through [`sanitize`] before it can
//! reach a caller. Passes repeat until nothing changes, which makes the
//! function idempotent even when one removal exposes another span.

use std::sync::OnceLock;

use regex::Regex;

/// Ordered (pattern, replacement) passes.
const PASSES: [(&str, &str); 4] = [
    // Parenthetical asides on one line, shortest match.
    (r"\([^\n]*?\)", ""),
    // Asterisk-delimited stage directions on one line.
    (r"\*[^\n]*?\*", ""),
    // Blank (or whitespace-only) lines.
    (r"\n(?:[ \t]*\n)+", "\n"),
    // Runs of spaces left behind by removals.
    (r"[ \t]{2,}", " "),
];

/// Strips stage directions and layout noise from model output.
#[derive(Debug, Clone)]
pub struct ReplySanitizer {
    passes: Vec<(Regex, &'static str)>,
}

impl Default for ReplySanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplySanitizer {
    /// Compile the pass table.
    pub fn new() -> Self {
        let passes = PASSES
            .iter()
            .filter_map(|(pattern, replacement)| {
                Regex::new(pattern).ok().map(|regex| (regex, *replacement))
            })
            .collect();
        Self { passes }
    }

    /// Run every pass once, then trim.
    fn pass(&self, text: &str) -> String {
        let mut out = text.to_owned();
        for (regex, replacement) in &self.passes {
            out = regex.replace_all(&out, *replacement).into_owned();
        }
        let trimmed: Vec<&str> = out.lines().map(str::trim).collect();
        trimmed.join("\n").trim().to_owned()
    }

    /// Sanitize until a fixed point.
    pub fn sanitize(&self, text: &str) -> String {
        let mut current = self.pass(text);
        loop {
            let next = self.pass(&current);
            // Each pass only deletes, so this terminates.
            if next == current {
                return current;
            }
            current = next;
        }
    }
}

/// Sanitize with a process-wide [`ReplySanitizer`].
pub fn sanitize(text: &str) -> String {
    static SANITIZER: OnceLock<ReplySanitizer> = OnceLock::new();
    SANITIZER.get_or_init(ReplySanitizer::new).sanitize(text)
}
