//! Dockerfile parser.
//!
//! Parses a Dockerfile into an ordered list of build steps. Comments and
//! line continuations are removed first; every remaining line is one step.
//! Arguments are either a JSON string array (exec form) or shell words
//! (shell form).

use std::sync::OnceLock;

use orca_core::error::{BuildError, Result};
use regex::Regex;
use serde_json::Value;

/// A single parsed Dockerfile line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStep {
    /// Lowercased instruction name, e.g. `run`.
    pub command: String,
    /// Arguments in order.
    pub args: Vec<String>,
    /// Whether the arguments came from a JSON array.
    pub json_form: bool,
}

/// Parsed Dockerfile: a non-empty list of steps starting with `from`.
#[derive(Debug, Clone)]
pub struct Dockerfile {
    pub steps: Vec<BuildStep>,
}

fn comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^[ \t]*#.*$").expect("valid comment regex"))
}

fn continuation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\\\r?\n").expect("valid continuation regex"))
}

impl Dockerfile {
    /// Parse a Dockerfile from its text content.
    pub fn parse(content: &str) -> Result<Self> {
        let uncommented = comment_re().replace_all(content, "");
        let joined = continuation_re().replace_all(&uncommented, " ");

        let mut steps = Vec::new();
        for (line_num, line) in joined.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            steps.push(parse_line(trimmed, line_num + 1)?);
        }

        let first = steps.first().ok_or_else(|| {
            BuildError::FormatError("Dockerfile contained no instructions".to_string())
        })?;
        if first.command != "from" {
            return Err(BuildError::FormatError(format!(
                "Dockerfiles must start with FROM, found {}",
                first.command.to_uppercase()
            )));
        }

        Ok(Dockerfile { steps })
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false for a successfully parsed Dockerfile.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Split one logical line into a step.
fn parse_line(line: &str, line_num: usize) -> Result<BuildStep> {
    let (keyword, rest) = split_first_word(line);
    let command = keyword.to_lowercase();

    if let Some(args) = parse_json_array(rest) {
        return Ok(BuildStep {
            command,
            args,
            json_form: true,
        });
    }

    let args = shell_words::split(rest).map_err(|e| {
        BuildError::FormatError(format!(
            "Line {}: cannot split arguments of {}: {}",
            line_num,
            keyword.to_uppercase(),
            e
        ))
    })?;

    Ok(BuildStep {
        command,
        args,
        json_form: false,
    })
}

/// Split a string into the first word and the rest.
fn split_first_word(s: &str) -> (&str, &str) {
    let s = s.trim();
    match s.find(char::is_whitespace) {
        Some(pos) => (&s[..pos], s[pos..].trim_start()),
        None => (s, ""),
    }
}

/// Exec-form arguments: a JSON array whose elements are all strings.
fn parse_json_array(s: &str) -> Option<Vec<String>> {
    match serde_json::from_str::<Value>(s).ok()? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(command: &str, args: &[&str], json_form: bool) -> BuildStep {
        BuildStep {
            command: command.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            json_form,
        }
    }

    // --- argument forms ---

    #[test]
    fn test_run_json_form() {
        let df = Dockerfile::parse("FROM scratch\nRUN [\"a\", \"b\"]").unwrap();
        assert_eq!(df.steps[1], step("run", &["a", "b"], true));
    }

    #[test]
    fn test_run_shell_form() {
        let df = Dockerfile::parse("FROM scratch\nRUN a b").unwrap();
        assert_eq!(df.steps[1], step("run", &["a", "b"], false));
    }

    #[test]
    fn test_shell_form_honors_quotes() {
        let df = Dockerfile::parse("FROM scratch\nLABEL desc=\"My App\" 'x=y z'").unwrap();
        assert_eq!(df.steps[1], step("label", &["desc=My App", "x=y z"], false));
    }

    #[test]
    fn test_non_string_json_array_is_shell_form() {
        let df = Dockerfile::parse("FROM scratch\nEXPOSE [8080]").unwrap();
        assert_eq!(df.steps[1], step("expose", &["[8080]"], false));
    }

    #[test]
    fn test_json_object_is_shell_form() {
        let df = Dockerfile::parse("FROM scratch\nLABEL {}").unwrap();
        assert_eq!(df.steps[1], step("label", &["{}"], false));
    }

    #[test]
    fn test_empty_json_array() {
        let df = Dockerfile::parse("FROM scratch\nCMD []").unwrap();
        assert_eq!(df.steps[1], step("cmd", &[], true));
    }

    #[test]
    fn test_instruction_without_arguments() {
        let df = Dockerfile::parse("FROM scratch\nCMD").unwrap();
        assert_eq!(df.steps[1], step("cmd", &[], false));
    }

    #[test]
    fn test_unterminated_quote_is_format_error() {
        let err = Dockerfile::parse("FROM scratch\nRUN echo \"oops").unwrap_err();
        assert!(err.is_format_error());
    }

    // --- structure ---

    #[test]
    fn test_commands_are_lowercased() {
        let df = Dockerfile::parse("from alpine\nWorkDir /app").unwrap();
        assert_eq!(df.steps[0], step("from", &["alpine"], false));
        assert_eq!(df.steps[1].command, "workdir");
    }

    #[test]
    fn test_continuations_are_joined() {
        let content = "FROM alpine:3.19\nRUN apk add --no-cache \\\n    curl \\\n    wget";
        let df = Dockerfile::parse(content).unwrap();
        assert_eq!(df.len(), 2);
        assert_eq!(
            df.steps[1],
            step("run", &["apk", "add", "--no-cache", "curl", "wget"], false)
        );
    }

    #[test]
    fn test_comments_and_blanks() {
        let content = "\n# comment\n\nFROM alpine\n\n   # indented comment\nRUN echo hi\n\n";
        let df = Dockerfile::parse(content).unwrap();
        assert_eq!(df.len(), 2);
        assert_eq!(df.steps[1], step("run", &["echo", "hi"], false));
    }

    #[test]
    fn test_parse_complex_dockerfile() {
        let content = r#"
# Build stage
FROM opensuse/leap:15

WORKDIR /app

ENV PYTHONDONTWRITEBYTECODE=1
ARG VERSION=1.0

COPY requirements.txt .
RUN ["pip", "install", "-r", "requirements.txt"]

EXPOSE 8080 8443/udp
LABEL version="1.0.0"
USER nobody

ENTRYPOINT ["python"]
CMD ["app.py"]
"#;
        let df = Dockerfile::parse(content).unwrap();
        assert_eq!(df.len(), 11);
        assert_eq!(df.steps[6], step("expose", &["8080", "8443/udp"], false));
        assert!(df.steps[10].json_form);
    }

    // --- validation ---

    #[test]
    fn test_empty_dockerfile() {
        let err = Dockerfile::parse("# just a comment\n\n").unwrap_err();
        assert!(err.is_format_error());
        assert!(Dockerfile::parse("").is_err());
    }

    #[test]
    fn test_must_start_with_from() {
        let err = Dockerfile::parse("RUN echo hello\nFROM alpine").unwrap_err();
        assert!(err.is_format_error());
        assert!(err.to_string().contains("must start with FROM"));
    }

    #[test]
    fn test_split_first_word() {
        assert_eq!(split_first_word("RUN  a b"), ("RUN", "a b"));
        assert_eq!(split_first_word("CMD"), ("CMD", ""));
        assert_eq!(split_first_word("  ENV\tA=1"), ("ENV", "A=1"));
    }
}
