//! Identity paths addressing nodes of the observed entity tree.

use std::fmt;

/// Ordered key tuple addressing one entity.
///
/// The empty path is the manager root. Ordering is lexicographic over the
/// segments, so every descendant of a path sorts directly after it; the
/// registry relies on this to find subtrees with a single range scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IdentityPath(Vec<String>);

impl IdentityPath {
    /// The manager-level root path.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a path from its segments, outermost first.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Path of the child `segment` below this one.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// Path of the parent node, `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of segments; the root has depth 0.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Last segment, i.e. the key of this node under its parent.
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Whether `prefix` equals this path or is one of its ancestors.
    pub fn starts_with(&self, prefix: &IdentityPath) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for IdentityPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.0 {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_and_children() {
        let root = IdentityPath::root();
        assert!(root.is_root());
        assert_eq!(root.depth(), 0);
        assert_eq!(root.parent(), None);

        let service = root.child("D1").child("180d");
        assert_eq!(service.depth(), 2);
        assert_eq!(service.last(), Some("180d"));
        assert_eq!(service.parent(), Some(IdentityPath::from_segments(["D1"])));
    }

    #[test]
    fn test_prefix_matching() {
        let device = IdentityPath::from_segments(["D1"]);
        let characteristic = IdentityPath::from_segments(["D1", "S1", "C1"]);
        let other = IdentityPath::from_segments(["D10"]);

        assert!(characteristic.starts_with(&device));
        assert!(device.starts_with(&device));
        assert!(characteristic.starts_with(&IdentityPath::root()));
        assert!(!other.starts_with(&device));
        assert!(!device.starts_with(&characteristic));
    }

    #[test]
    fn test_descendants_sort_after_ancestor() {
        let device = IdentityPath::from_segments(["a"]);
        let nested = IdentityPath::from_segments(["a", "z"]);
        let sibling = IdentityPath::from_segments(["a0"]);

        assert!(device < nested);
        assert!(nested < sibling);
    }

    #[test]
    fn test_display() {
        assert_eq!(IdentityPath::root().to_string(), "/");
        assert_eq!(
            IdentityPath::from_segments(["D1", "S1"]).to_string(),
            "/D1/S1"
        );
    }
}
