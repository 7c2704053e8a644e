//! Presence rules applied before a node is rendered.

use healthview_core::RenderConfig;

/// Suppression rules in force for one flattening pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    hidden_fields: Vec<String>,
    hidden_paths: Vec<String>,
}

impl Constraints {
    /// Rules for `profile`: the configured hidden fields plus the paths
    /// hidden for that profile.
    pub fn for_profile(config: &RenderConfig, profile: &str) -> Self {
        Self {
            hidden_fields: config.hidden_fields.clone(),
            hidden_paths: config
                .hidden_paths
                .get(profile)
                .cloned()
                .unwrap_or_default(),
        }
    }

    /// Whether the node at `path` may be rendered.
    pub fn allows(&self, path: &str) -> bool {
        let field = path.rsplit('.').next().unwrap_or(path);
        if path.contains('.') && self.hidden_fields.iter().any(|hidden| hidden == field) {
            return false;
        }
        !self.hidden_paths.iter().any(|hidden| {
            path == hidden
                || path
                    .strip_prefix(hidden.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }
}
