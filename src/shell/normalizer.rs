// ABOUTME: Command normalization before execution: flattening, --env tagging, separators.
// ABOUTME: Also strips boilerplate lines some remote shells echo into captured output.

/// Lines some shells print on non-interactive sessions.
const NOISE_LINES: &[&str] = &[
    "stdin: is not a tty",
    "mesg: ttyname failed: Inappropriate ioctl for device",
];

/// One command or an arbitrarily nested list of commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandInput {
    One(String),
    Many(Vec<CommandInput>),
}

impl CommandInput {
    /// Flatten into a single ordered list.
    pub fn flatten(self) -> Vec<String> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(self, out: &mut Vec<String>) {
        match self {
            CommandInput::One(command) => out.push(command),
            CommandInput::Many(commands) => {
                for command in commands {
                    command.flatten_into(out);
                }
            }
        }
    }
}

impl From<&str> for CommandInput {
    fn from(value: &str) -> Self {
        CommandInput::One(value.to_string())
    }
}

impl From<String> for CommandInput {
    fn from(value: String) -> Self {
        CommandInput::One(value)
    }
}

impl From<&String> for CommandInput {
    fn from(value: &String) -> Self {
        CommandInput::One(value.clone())
    }
}

impl<T: Into<CommandInput>> From<Vec<T>> for CommandInput {
    fn from(value: Vec<T>) -> Self {
        CommandInput::Many(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<CommandInput>, const N: usize> From<[T; N]> for CommandInput {
    fn from(value: [T; N]) -> Self {
        CommandInput::Many(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<CommandInput> + Clone> From<&[T]> for CommandInput {
    fn from(value: &[T]) -> Self {
        CommandInput::Many(value.iter().cloned().map(Into::into).collect())
    }
}

/// Rewrites commands for the target environment.
#[derive(Debug, Clone)]
pub struct Normalizer {
    stage: Option<String>,
    separator: String,
    env_tagged: Vec<String>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            stage: None,
            separator: "/".to_string(),
            env_tagged: vec!["artisan".to_string()],
        }
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage appended as `--env="<stage>"` to framework commands.
    pub fn stage(mut self, stage: Option<impl Into<String>>) -> Self {
        self.stage = stage.map(Into::into);
        self
    }

    /// Directory separator used by the target.
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Binaries whose invocations receive the `--env` flag.
    pub fn env_tagged(mut self, binaries: Vec<String>) -> Self {
        self.env_tagged = binaries;
        self
    }

    /// Flatten and rewrite commands. Never fails; unknown shapes pass through.
    pub fn normalize(&self, commands: impl Into<CommandInput>) -> Vec<String> {
        commands
            .into()
            .flatten()
            .into_iter()
            .map(|command| self.process(command))
            .collect()
    }

    fn process(&self, command: String) -> String {
        let command = self.tag_environment(command);
        if self.separator == "/" {
            command
        } else {
            rewrite_separators(&command, &self.separator)
        }
    }

    fn tag_environment(&self, command: String) -> String {
        let Some(stage) = &self.stage else {
            return command;
        };

        if command.contains("--env=") || !self.is_env_tagged(&command) {
            return command;
        }

        format!("{} --env=\"{}\"", command, stage)
    }

    /// Whether the command invokes one of the tagged binaries, directly or
    /// through an interpreter (`php artisan ...`).
    fn is_env_tagged(&self, command: &str) -> bool {
        let mut words = command.split_whitespace();
        let Some(first) = words.next() else {
            return false;
        };

        let is_tagged = |word: &str| {
            let name = word.rsplit('/').next().unwrap_or(word);
            self.env_tagged.iter().any(|binary| binary == name)
        };

        if is_tagged(first) {
            return true;
        }

        let interpreter = first.rsplit('/').next().unwrap_or(first);
        matches!(interpreter, "php" | "python" | "python3" | "node")
            && words.next().is_some_and(is_tagged)
    }
}

/// Characters that make a neighbouring `/` part of a path.
fn is_path_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '-' | '~' | '?' | '*' | ':')
}

/// Replace `/` with `separator` where it separates path components.
///
/// A slash is rewritten when the character before or after it is a path
/// character (alphanumeric or one of `_ . - ~ ? * :`) and it is not escaped
/// by a backslash. Slashes between spaces and shell punctuation, such as the
/// `/;` terminating a `find -exec`, are left alone. A URL (`scheme://...`) is
/// copied unchanged up to the next whitespace or quote.
pub fn rewrite_separators(command: &str, separator: &str) -> String {
    let chars: Vec<char> = command.chars().collect();
    let mut out = String::with_capacity(command.len());
    let mut in_url = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_url {
            in_url = !(c.is_whitespace() || c == '"' || c == '\'');
            out.push(c);
            continue;
        }

        if c == ':' && chars.get(i + 1) == Some(&'/') && chars.get(i + 2) == Some(&'/') {
            in_url = true;
            out.push(c);
            continue;
        }

        if c != '/' {
            out.push(c);
            continue;
        }

        let before = i.checked_sub(1).map(|j| chars[j]);
        let after = chars.get(i + 1).copied();

        let escaped = before == Some('\\');
        let in_path = before.is_some_and(is_path_char) || after.is_some_and(is_path_char);

        if in_path && !escaped {
            out.push_str(separator);
        } else {
            out.push(c);
        }
    }

    out
}

/// Drop known boilerplate lines from captured output.
pub fn strip_noise(output: &str) -> String {
    output
        .lines()
        .filter(|line| !NOISE_LINES.contains(&line.trim()))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
