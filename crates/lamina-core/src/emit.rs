//! Templated text emission.
//!
//! [`CodeWriter`] is an accumulating buffer with indentation-scope management
//! and named-placeholder line templating. Backends write generated source
//! through it one logical unit at a time; non-fatal problems are recorded via
//! [`CodeWriter::add_error`] without halting emission, and the driver decides
//! afterwards what to do with the collected errors.
//!
//! ## Template syntax
//!
//! Templates contain `{name}` placeholders bound by the substitution list
//! passed to [`CodeWriter::output`]. Doubled braces (`{{`, `}}`) escape to
//! literal single braces, which generated Rust source needs constantly.

/// Accumulating code buffer with indentation and placeholder templating
#[derive(Debug)]
pub struct CodeWriter {
    buf: String,
    indent: usize,
    indent_str: String,
    errors: Vec<String>,
}

impl Default for CodeWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeWriter {
    /// Creates a writer with the standard four-space indent
    pub fn new() -> Self {
        Self {
            buf: String::new(),
            indent: 0,
            indent_str: "    ".to_string(),
            errors: Vec::new(),
        }
    }

    /// Appends one logical unit of text.
    ///
    /// Each `{name}` placeholder is replaced with its bound substitution and
    /// the current indentation prefix is applied to every non-empty emitted
    /// line. A placeholder with no binding is left verbatim and recorded as
    /// an error; emission continues.
    pub fn output(&mut self, template: &str, subs: &[(&str, &str)]) {
        let rendered = self.substitute(template, subs);
        // Trailing newlines in multi-line templates would otherwise double up
        // with the per-line newline added here.
        for line in rendered.trim_end_matches('\n').split('\n') {
            if line.is_empty() {
                self.buf.push('\n');
            } else {
                for _ in 0..self.indent {
                    self.buf.push_str(&self.indent_str);
                }
                self.buf.push_str(line);
                self.buf.push('\n');
            }
        }
    }

    /// Runs `f` with the indentation increased by one level.
    ///
    /// The increase is reverted on every exit path of the closure.
    pub fn indented<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.indent += 1;
        let result = f(self);
        self.indent -= 1;
        result
    }

    /// Writes the generated-file banner that opens every emitted file
    pub fn write_generated_header(&mut self, source_name: &str) {
        self.output(
            "// Generated by protoc-gen-lamina. DO NOT EDIT!\n\
             // source: {source}",
            &[("source", source_name)],
        );
        self.output("", &[]);
    }

    /// Records a non-fatal error associated with the current file
    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    /// Returns the errors recorded so far
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Returns the emitted text so far
    pub fn value(&self) -> &str {
        &self.buf
    }

    /// Consumes the writer, returning the emitted text and recorded errors
    pub fn finish(self) -> (String, Vec<String>) {
        (self.buf, self.errors)
    }

    fn substitute(&mut self, template: &str, subs: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(template.len());
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for n in chars.by_ref() {
                        if n == '}' {
                            closed = true;
                            break;
                        }
                        name.push(n);
                    }
                    if !closed {
                        self.errors
                            .push(format!("unterminated placeholder '{{{}' in template", name));
                        out.push('{');
                        out.push_str(&name);
                    } else if let Some((_, value)) = subs.iter().find(|(k, _)| *k == name) {
                        out.push_str(value);
                    } else {
                        self.errors
                            .push(format!("no substitution bound for placeholder '{{{}}}'", name));
                        out.push('{');
                        out.push_str(&name);
                        out.push('}');
                    }
                }
                '}' => {
                    self.errors
                        .push("unmatched '}' in template".to_string());
                    out.push('}');
                }
                _ => out.push(c),
            }
        }

        out
    }
}
