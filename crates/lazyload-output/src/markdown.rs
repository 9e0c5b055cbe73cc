//! Small markdown building blocks shared by the tool renderers.

pub fn heading(level: usize, text: &str) -> String {
    format!("{} {}\n\n", "#".repeat(level.clamp(1, 6)), text)
}

pub fn bullet(text: &str) -> String {
    format!("- {}\n", text)
}

pub fn code_block(language: &str, code: &str) -> String {
    format!("```{}\n{}\n```\n", language, code.trim_end_matches('\n'))
}

/// `name (kind) — path:line`
pub fn symbol_line(name: &str, kind: &str, path: &str, line: u32) -> String {
    format!("{} ({}) — {}:{}", name, kind, path, line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading() {
        assert_eq!(heading(2, "Callers"), "## Callers\n\n");
        assert_eq!(heading(9, "Deep"), "###### Deep\n\n");
    }

    #[test]
    fn test_code_block() {
        assert_eq!(
            code_block("typescript", "const x = 1;\n"),
            "```typescript\nconst x = 1;\n```\n"
        );
    }

    #[test]
    fn test_symbol_line() {
        assert_eq!(
            symbol_line("greet", "function", "src/app.ts", 3),
            "greet (function) — src/app.ts:3"
        );
    }
}
