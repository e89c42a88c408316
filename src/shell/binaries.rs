// ABOUTME: Binary discovery on the target with a per-session cache.
// ABOUTME: Strategies use it to check their tool exists before running it.

use super::Shell;
use crate::connection::Result;

impl Shell {
    /// Absolute path of `binary` on the target, if installed.
    ///
    /// Lookups are cached for the lifetime of the shell, separately for the
    /// remote and local connections.
    pub async fn which(&self, binary: &str) -> Result<Option<String>> {
        let key = (self.is_local(), binary.to_string());
        let cached = self.binaries.lock().get(&key).cloned();
        if let Some(path) = cached {
            return Ok(path);
        }

        let output = self.run_raw(&format!("command -v {}", binary)).await?;
        let path = output
            .lines()
            .into_iter()
            .next()
            .filter(|_| output.success());

        match &path {
            Some(found) => tracing::debug!("Found {} at {}", binary, found),
            None => tracing::debug!("{} not found on {}", binary, self.host()),
        }

        self.binaries.lock().insert(key, path.clone());
        Ok(path)
    }

    /// Message reported when a strategy's binary is missing.
    pub fn binary_missing_message(&self, binary: &str) -> String {
        format!("{} could not be found on {}", binary, self.host())
    }
}
