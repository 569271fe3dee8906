//! Chunks: ordered pipe stages annotated with the originating node's cost.
//!
//! Rendered layout:
//!
//! ```text
//! [<in_sql>|> ]<stage 1>
//! |> <stage 2>
//! -- cost: <cost>
//! ```

use std::fmt::Write as _;

/// Shortest round-trip rendering that always keeps a fractional part
/// (`5236.0`, `3937.42`).
pub fn format_cost(cost: f64) -> String {
    format!("{:?}", cost)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub statements: Vec<String>,
    pub cost: f64,
}

impl Chunk {
    pub fn new(cost: f64) -> Self {
        Self {
            statements: Vec::new(),
            cost,
        }
    }

    pub fn push(&mut self, statement: impl Into<String>) -> &mut Self {
        self.statements.push(statement.into());
        self
    }

    /// Push `statement` if present.
    pub fn push_opt(&mut self, statement: Option<String>) -> &mut Self {
        if let Some(s) = statement {
            self.statements.push(s);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Chain this chunk after `in_sql`. A chunk without statements leaves
    /// `in_sql` untouched.
    pub fn render(&self, in_sql: &str) -> String {
        if self.is_empty() {
            return in_sql.to_string();
        }
        let mut out = String::with_capacity(in_sql.len() + 64);
        if !in_sql.is_empty() {
            out.push_str(in_sql);
            out.push_str("|> ");
        }
        out.push_str(&self.statements.join("\n|> "));
        let _ = writeln!(out, "\n-- cost: {}", format_cost(self.cost));
        out
    }
}

/// Render `statements` as one chunk chained after `in_sql`.
pub fn gen_chunk<S: AsRef<str>>(statements: &[S], cost: f64, in_sql: &str) -> String {
    let mut chunk = Chunk::new(cost);
    for s in statements {
        chunk.push(s.as_ref());
    }
    chunk.render(in_sql)
}

/// Append a single stage (without a cost line) to `in_sql`.
pub fn pipe(in_sql: &str, stage: &str) -> String {
    if in_sql.is_empty() {
        format!("{}\n", stage)
    } else {
        format!("{}|> {}\n", in_sql, stage)
    }
}

/// Indent every line of `sql` by `width` spaces. The trailing newline is
/// dropped so the result can be wrapped in parentheses.
pub fn indent(sql: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    sql.lines()
        .map(|line| format!("{}{}", pad, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `(\n<indented sql>\n)`
pub fn parenthesize(sql: &str, width: usize) -> String {
    format!("(\n{}\n)", indent(sql, width))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn costs_keep_their_fraction() {
        assert_eq!(format_cost(5236.0), "5236.0");
        assert_eq!(format_cost(3937.42), "3937.42");
        assert_eq!(format_cost(0.0), "0.0");
    }

    #[test]
    fn first_stage_has_no_pipe() {
        assert_eq!(
            gen_chunk(&["FROM `t`", "SELECT a"], 1.5, ""),
            "FROM `t`\n|> SELECT a\n-- cost: 1.5\n"
        );
    }

    #[test]
    fn chains_after_input() {
        let input = "FROM `t`\n-- cost: 1.0\n";
        assert_eq!(
            gen_chunk(&["LIMIT 10"], 2.0, input),
            "FROM `t`\n-- cost: 1.0\n|> LIMIT 10\n-- cost: 2.0\n"
        );
    }

    #[test]
    fn empty_chunk_passes_input_through() {
        assert_eq!(Chunk::new(3.0).render("FROM `t`\n"), "FROM `t`\n");
        assert_eq!(Chunk::new(3.0).render(""), "");
    }

    #[test]
    fn indent_drops_trailing_newline() {
        assert_eq!(indent("a\n|> b\n", 2), "  a\n  |> b");
        assert_eq!(parenthesize("a\n", 4), "(\n    a\n)");
    }

    #[test]
    fn pipe_appends_bare_stage() {
        assert_eq!(pipe("", "AS `r`"), "AS `r`\n");
        assert_eq!(pipe("FROM `t`\n", "AS `r`"), "FROM `t`\n|> AS `r`\n");
    }
}
