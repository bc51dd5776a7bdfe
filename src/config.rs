use serde::Deserialize;

/// Names of the structural containers the mirror creates in the host scene.
///
/// Each document lives at `root_container / <filename> / inbox_container`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Top-level container shared by all mirrored documents.
    pub root_container: String,
    /// Per-document container that receives identifier-0 parent references.
    pub inbox_container: String,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            root_container: "Plasticity".into(),
            inbox_container: "Inbox".into(),
        }
    }
}

impl MirrorConfig {
    /// Sets the top-level container name.
    #[must_use]
    pub fn with_root_container(mut self, name: impl Into<String>) -> Self {
        self.root_container = name.into();
        self
    }

    /// Sets the per-document inbox container name.
    #[must_use]
    pub fn with_inbox_container(mut self, name: impl Into<String>) -> Self {
        self.inbox_container = name.into();
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: MirrorConfig =
            serde_json::from_str(r#"{"inbox_container": "Incoming"}"#).unwrap();
        assert_eq!(config.root_container, "Plasticity");
        assert_eq!(config.inbox_container, "Incoming");
    }

    #[test]
    fn builder() {
        let config = MirrorConfig::default().with_root_container("Mirror");
        assert_eq!(config.root_container, "Mirror");
        assert_eq!(config.inbox_container, "Inbox");
    }
}
