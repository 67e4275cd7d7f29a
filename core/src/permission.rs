//! Permission nodes attached to categories and commands.
//!
//! Only the node itself lives here; deciding whether a caller holds it is
//! up to [`Caller::has_permission`](crate::Caller::has_permission).

use std::fmt;

/// Dotted permission path such as `edict.admin.reload`.
///
/// The empty node is unrestricted: every caller may use it without a check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PermissionNode(String);

impl PermissionNode {
    pub fn unrestricted() -> Self {
        Self::default()
    }

    pub fn new(path: impl Into<String>) -> Self {
        let path: String = path.into();
        Self(path.trim_matches('.').to_string())
    }

    /// Node for `segment` beneath `self`. A blank segment yields `self`.
    pub fn child(&self, segment: &str) -> Self {
        let segment = segment.trim_matches('.');
        if segment.is_empty() {
            self.clone()
        } else if self.0.is_empty() {
            Self(segment.to_string())
        } else {
            Self(format!("{}.{segment}", self.0))
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PermissionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
