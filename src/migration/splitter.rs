//! Splits a script into individual statements
//!
//! Comments are removed first, then the text is cut on `;`. Semicolons
//! inside quoted strings or identifiers do not split, and neither do the
//! semicolons inside a `CREATE TRIGGER ... BEGIN ... END` body.

/// Removes `--` line comments and `/* */` block comments outside quotes.
///
/// Line comments keep their newline; block comments become one space.
pub fn strip_comments(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(close) = quote {
            out.push(c);
            if c == close {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                out.push(c);
            }
            '[' => {
                quote = Some(']');
                out.push(c);
            }
            '-' if chars.peek() == Some(&'-') => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for skipped in chars.by_ref() {
                    if prev == '*' && skipped == '/' {
                        break;
                    }
                    prev = skipped;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }

    out
}

/// Splits comment-free SQL into trimmed, non-empty statements without the
/// terminating `;`.
pub fn split_statements(sql: &str) -> Vec<String> {
    let sql = strip_comments(sql);
    let mut splitter = Splitter::default();
    for c in sql.chars() {
        splitter.push(c);
    }
    splitter.finish()
}

#[derive(Default)]
struct Splitter {
    statements: Vec<String>,
    current: String,
    word: String,
    head: Vec<String>,
    quote: Option<char>,
    depth: u32,
}

impl Splitter {
    fn push(&mut self, c: char) {
        if let Some(close) = self.quote {
            self.current.push(c);
            if c == close {
                self.quote = None;
            }
            return;
        }

        if c.is_ascii_alphanumeric() || c == '_' {
            self.word.push(c);
            self.current.push(c);
            return;
        }
        self.end_word();

        match c {
            '\'' | '"' | '`' => self.quote = Some(c),
            '[' => self.quote = Some(']'),
            ';' if self.depth == 0 => {
                self.end_statement();
                return;
            }
            _ => {}
        }
        self.current.push(c);
    }

    fn end_word(&mut self) {
        if self.word.is_empty() {
            return;
        }
        let word = std::mem::take(&mut self.word).to_ascii_uppercase();

        if self.is_trigger() {
            match word.as_str() {
                "BEGIN" | "CASE" => self.depth += 1,
                "END" => self.depth = self.depth.saturating_sub(1),
                _ => {}
            }
        }
        if self.head.len() < 3 {
            self.head.push(word);
        }
    }

    /// `CREATE [TEMP|TEMPORARY] TRIGGER ...`
    fn is_trigger(&self) -> bool {
        match self.head.as_slice() {
            [create, trigger, ..] if create == "CREATE" && trigger == "TRIGGER" => true,
            [create, temp, trigger, ..] => {
                create == "CREATE"
                    && (temp == "TEMP" || temp == "TEMPORARY")
                    && trigger == "TRIGGER"
            }
            _ => false,
        }
    }

    fn end_statement(&mut self) {
        let statement = self.current.trim();
        if !statement.is_empty() {
            self.statements.push(statement.to_string());
        }
        self.current.clear();
        self.head.clear();
        self.depth = 0;
    }

    fn finish(mut self) -> Vec<String> {
        self.end_word();
        self.end_statement();
        self.statements
    }
}
