//! DOT format utilities.

use std::fmt::Write;

/// Whether `id` can be written unquoted: ASCII alphanumerics and `_`, not
/// starting with a digit.
pub fn is_bare_id(id: &str) -> bool {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Escape `\` and `"` for a quoted DOT id.
pub fn escape_id(input: &str) -> String {
    input.replace('\\', "\\\\").replace('"', "\\\"")
}

/// `id` as written in DOT output, quoted when needed.
///
/// Metric-style names such as `job:up:sum` always come out quoted.
pub fn quote_id(id: &str) -> String {
    if is_bare_id(id) {
        id.to_string()
    } else {
        format!("\"{}\"", escape_id(id))
    }
}

/// Statements sit one level inside the graph body.
const INDENT: &str = "  ";

/// Line-oriented builder for an anonymous `digraph`.
pub struct DotBuilder {
    output: String,
}

impl Default for DotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DotBuilder {
    pub fn new() -> Self {
        let mut output = String::with_capacity(4096);
        output.push_str("digraph {\n");
        Self { output }
    }

    /// Add a blank line for readability.
    pub fn blank(&mut self) -> &mut Self {
        self.output.push('\n');
        self
    }

    /// Add a node with bare attributes: `id [key=value, ...]`.
    pub fn node(&mut self, id: &str, attrs: &[(&str, &str)]) -> &mut Self {
        self.output.push_str(INDENT);
        let _ = write!(self.output, "{} [", quote_id(id));
        for (i, (key, value)) in attrs.iter().enumerate() {
            if i > 0 {
                self.output.push_str(", ");
            }
            let _ = write!(self.output, "{key}={value}");
        }
        self.output.push_str("]\n");
        self
    }

    pub fn edge(&mut self, from: &str, to: &str) -> &mut Self {
        self.output.push_str(INDENT);
        let _ = writeln!(self.output, "{} -> {}", quote_id(from), quote_id(to));
        self
    }

    /// Finish building and return the DOT string.
    pub fn build(mut self) -> String {
        self.output.push_str("}\n");
        self.output
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_quote_id() {
        assert_eq!(quote_id("up"), "up");
        assert_eq!(quote_id("_x1"), "_x1");
        assert_eq!(quote_id("job:up:sum"), "\"job:up:sum\"");
        assert_eq!(quote_id("1abc"), "\"1abc\"");
        assert_eq!(quote_id("a-b"), "\"a-b\"");
        assert_eq!(quote_id(""), "\"\"");
        assert_eq!(quote_id(r#"say "hi"\"#), r#""say \"hi\"\\""#);
    }

    #[test]
    fn test_builder_layout() {
        let mut dot = DotBuilder::new();
        dot.node("a:b", &[("shape", "oval")]).blank().edge("a:b", "c");
        assert_eq!(
            dot.build(),
            "digraph {\n  \"a:b\" [shape=oval]\n\n  \"a:b\" -> c\n}\n"
        );
    }
}
