use lazyload_core::types::{DocBlock, DocParam};

/// How a module declares its public surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DunderAll {
    /// `__all__ = ["a", "b"]` with only string literals.
    Literal(Vec<String>),
    /// `__all__` exists but is computed; fall back to the underscore rule.
    Dynamic,
}

/// Dunder names (`__init__`, `__repr__`) are not private despite the
/// leading underscores.
pub fn is_python_private(name: &str) -> bool {
    name.starts_with('_') && !(name.starts_with("__") && name.ends_with("__"))
}

/// The docstring formats the parser understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocstringFormat {
    Google,
    Numpy,
    Sphinx,
    Plain,
}

impl DocstringFormat {
    pub fn from_config(value: Option<&str>) -> Option<Self> {
        match value {
            Some("google") => Some(DocstringFormat::Google),
            Some("numpy") => Some(DocstringFormat::Numpy),
            Some("sphinx") => Some(DocstringFormat::Sphinx),
            _ => None,
        }
    }
}

/// Auto-detect the docstring convention from its content.
pub fn detect_format(text: &str) -> DocstringFormat {
    if text.contains(":param") || text.contains(":returns:") || text.contains(":return:") {
        return DocstringFormat::Sphinx;
    }
    // NumPy sections are underlined with dashes.
    for (line, next) in text.lines().zip(text.lines().skip(1)) {
        let header = line.trim();
        if (header == "Parameters" || header == "Returns" || header == "Raises")
            && next.trim().chars().all(|c| c == '-')
            && next.trim().len() >= 3
        {
            return DocstringFormat::Numpy;
        }
    }
    if text.contains("Args:") || text.contains("Returns:") || text.contains("Raises:") {
        return DocstringFormat::Google;
    }
    DocstringFormat::Plain
}

/// Strip quotes and common indentation from a raw docstring literal.
pub fn clean_docstring(raw: &str) -> String {
    let stripped = raw
        .trim()
        .trim_start_matches("r\"\"\"")
        .trim_start_matches("\"\"\"")
        .trim_start_matches("r'''")
        .trim_start_matches("'''")
        .trim_end_matches("\"\"\"")
        .trim_end_matches("'''");
    let lines: Vec<&str> = stripped.lines().collect();
    let indent = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .enumerate()
        .map(|(i, l)| {
            if i == 0 {
                l.trim_start().to_string()
            } else if l.len() >= indent {
                l[indent..].to_string()
            } else {
                l.trim_start().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Parse a docstring into the documentation record, auto-detecting the
/// format unless one is forced.
pub fn parse_docstring(raw: &str, forced: Option<DocstringFormat>) -> DocBlock {
    let text = clean_docstring(raw);
    let format = forced.unwrap_or_else(|| detect_format(&text));
    match format {
        DocstringFormat::Google => parse_google(&text),
        DocstringFormat::Numpy => parse_numpy(&text),
        DocstringFormat::Sphinx => parse_sphinx(&text),
        DocstringFormat::Plain => DocBlock {
            description: non_empty(text),
            ..DocBlock::default()
        },
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.trim().to_string())
    }
}

fn parse_google(text: &str) -> DocBlock {
    let mut doc = DocBlock::default();
    let mut description = Vec::new();
    let mut section: Option<&str> = None;
    let mut returns = Vec::new();
    let mut raises = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        match trimmed {
            "Args:" | "Arguments:" => {
                section = Some("args");
                continue;
            }
            "Returns:" => {
                section = Some("returns");
                continue;
            }
            "Raises:" => {
                section = Some("raises");
                continue;
            }
            "Yields:" | "Examples:" | "Example:" | "Note:" | "Notes:" | "Attributes:" => {
                section = Some("other");
                continue;
            }
            _ => {}
        }
        match section {
            None => description.push(trimmed.to_string()),
            Some("args") => {
                if let Some((name_part, desc)) = trimmed.split_once(':') {
                    // `name (type): desc`
                    let name = name_part
                        .split('(')
                        .next()
                        .unwrap_or(name_part)
                        .trim()
                        .to_string();
                    if !name.is_empty() && !name.contains(' ') {
                        doc.params.push(DocParam {
                            name,
                            description: desc.trim().to_string(),
                        });
                    } else if let Some(last) = doc.params.last_mut() {
                        last.description.push(' ');
                        last.description.push_str(trimmed);
                    }
                } else if let Some(last) = doc.params.last_mut() {
                    if !trimmed.is_empty() {
                        last.description.push(' ');
                        last.description.push_str(trimmed);
                    }
                }
            }
            Some("returns") => returns.push(trimmed.to_string()),
            Some("raises") => raises.push(trimmed.to_string()),
            _ => {}
        }
    }

    doc.description = non_empty(description.join(" "));
    doc.returns = non_empty(returns.join(" "));
    doc.throws = non_empty(raises.join(" "));
    doc
}

fn parse_numpy(text: &str) -> DocBlock {
    let mut doc = DocBlock::default();
    let mut description = Vec::new();
    let mut section: Option<&str> = None;
    let mut returns = Vec::new();
    let mut raises = Vec::new();
    let mut lines = text.lines().peekable();

    while let Some(line) = lines.next() {
        let trimmed = line.trim();
        let underlined = lines
            .peek()
            .map(|next| {
                let n = next.trim();
                !n.is_empty() && n.chars().all(|c| c == '-')
            })
            .unwrap_or(false);
        if underlined {
            section = match trimmed {
                "Parameters" => Some("params"),
                "Returns" => Some("returns"),
                "Raises" => Some("raises"),
                _ => Some("other"),
            };
            lines.next(); // consume the dashes
            continue;
        }
        match section {
            None => description.push(trimmed.to_string()),
            Some("params") => {
                if trimmed.is_empty() {
                    continue;
                }
                // `name : type` introduces a parameter; indented lines describe it.
                let indented = line.starts_with(' ') || line.starts_with('\t');
                if !indented {
                    let name = trimmed.split(':').next().unwrap_or(trimmed).trim();
                    if !name.is_empty() {
                        doc.params.push(DocParam {
                            name: name.to_string(),
                            description: String::new(),
                        });
                    }
                } else if let Some(last) = doc.params.last_mut() {
                    if !last.description.is_empty() {
                        last.description.push(' ');
                    }
                    last.description.push_str(trimmed);
                }
            }
            Some("returns") => returns.push(trimmed.to_string()),
            Some("raises") => raises.push(trimmed.to_string()),
            _ => {}
        }
    }

    doc.description = non_empty(description.join(" "));
    doc.returns = non_empty(returns.join(" "));
    doc.throws = non_empty(raises.join(" "));
    doc
}

fn parse_sphinx(text: &str) -> DocBlock {
    let mut doc = DocBlock::default();
    let mut description = Vec::new();
    let mut returns = Vec::new();
    let mut raises = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix(":param ") {
            if let Some((name, desc)) = rest.split_once(':') {
                // `:param type name: desc` keeps only the final token as name.
                let name = name.split_whitespace().last().unwrap_or("").to_string();
                if !name.is_empty() {
                    doc.params.push(DocParam {
                        name,
                        description: desc.trim().to_string(),
                    });
                }
            }
        } else if let Some(rest) = trimmed
            .strip_prefix(":returns:")
            .or_else(|| trimmed.strip_prefix(":return:"))
        {
            returns.push(rest.trim().to_string());
        } else if let Some(rest) = trimmed.strip_prefix(":raises") {
            let rest = rest.trim_start_matches(|c| c != ':').trim_start_matches(':');
            raises.push(rest.trim().to_string());
        } else if trimmed.starts_with(':') {
            // Other field lists (:rtype:, :type x:) are not captured.
            continue;
        } else {
            description.push(trimmed.to_string());
        }
    }

    doc.description = non_empty(description.join(" "));
    doc.returns = non_empty(returns.join(" "));
    doc.throws = non_empty(raises.join(" "));
    doc
}
