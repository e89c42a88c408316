// ABOUTME: Pure path arithmetic: component explosion and relative path computation.
// ABOUTME: Performs no I/O, so results are identical for local and remote targets.

use std::fmt;

/// An ordered sequence of path components.
///
/// A leading empty component marks an absolute path, so `/var/www` explodes
/// to `["", "var", "www"]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathSpec(Vec<String>);

impl PathSpec {
    pub fn new(components: Vec<String>) -> Self {
        Self(components)
    }

    pub fn components(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_absolute(&self) -> bool {
        self.0.first().is_some_and(|c| c.is_empty())
    }

    /// Join the components back into a path string.
    pub fn join(&self, separator: &str) -> String {
        // The root alone would otherwise join to an empty string
        if self.0.len() == 1 && self.0[0].is_empty() {
            return separator.to_string();
        }
        self.0.join(separator)
    }
}

impl fmt::Display for PathSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.join("/"))
    }
}

impl<S: Into<String>> FromIterator<S> for PathSpec {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Split `path` into components, resolving `.` and `..`.
///
/// Empty components (double separators) and `.` are dropped. `..` pops the
/// previous component, except that it is kept literally while the result is
/// empty or already ends in `..`, and it is ignored at the root.
pub fn explode_path(path: &str, separator: &str) -> PathSpec {
    let mut result: Vec<String> = Vec::new();

    if separator.is_empty() {
        return PathSpec(result);
    }

    if path.starts_with(separator) {
        result.push(String::new());
    }

    for component in path.split(separator) {
        match component {
            ".." => {
                if result.is_empty() || result.last().is_some_and(|c| c == "..") {
                    result.push("..".to_string());
                } else if result.len() == 1 && result[0].is_empty() {
                    // Already at the root
                } else {
                    result.pop();
                }
            }
            "." | "" => {}
            other => result.push(other.to_string()),
        }
    }

    PathSpec(result)
}

/// Components of the path leading from `from` to `to`.
///
/// `from` is treated as a file: the path is relative to its parent directory.
/// For `from = /releases/current/file` and `to = /releases/shared/file` the
/// result is `../shared/file`.
pub fn relative_path(from: &str, to: &str) -> PathSpec {
    let from = explode_path(from, "/");
    let to = explode_path(to, "/");

    // Directory depth of `from`, excluding its leaf
    let from_dirs = from.0.len().saturating_sub(1);

    // Unlike a plain longest common prefix, the leaf of `from` never counts:
    // a link at /a/b to /a/b/c must read b/c, since the link replaces b
    let common = from
        .0
        .iter()
        .zip(to.0.iter())
        .take(from_dirs)
        .take_while(|(a, b)| a == b)
        .count();

    let mut result: Vec<String> = Vec::new();
    if common < from_dirs {
        result.extend(std::iter::repeat_n("..".to_string(), from_dirs - common));
    }
    result.extend(to.0[common..].iter().cloned());

    PathSpec(result)
}
