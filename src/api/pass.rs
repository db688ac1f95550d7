//! Render pass ordering and pass ranges.
//!
//! Two transient images may share memory only if the pass ranges they declare are
//! disjoint. The ranges come from the pass scheduler and are trusted: a range that is
//! too narrow lets two live images share memory and corrupts their contents.

/// Logical render passes, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FrameArenaPass {
    Prepass,
    Shadow,
    Ssao,
    Main,
    Post,
    Ui,
}

impl FrameArenaPass {
    /// All passes in execution order.
    pub const ALL: [FrameArenaPass; 6] = [
        FrameArenaPass::Prepass,
        FrameArenaPass::Shadow,
        FrameArenaPass::Ssao,
        FrameArenaPass::Main,
        FrameArenaPass::Post,
        FrameArenaPass::Ui,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FrameArenaPass::Prepass => "prepass",
            FrameArenaPass::Shadow => "shadow",
            FrameArenaPass::Ssao => "ssao",
            FrameArenaPass::Main => "main",
            FrameArenaPass::Post => "post",
            FrameArenaPass::Ui => "ui",
        }
    }
}

/// Closed interval `[first, last]` of passes during which an image is read or written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PassRange {
    first: FrameArenaPass,
    last: FrameArenaPass,
}

impl PassRange {
    /// Create a range. Returns `None` if `first` comes after `last`.
    pub fn new(first: FrameArenaPass, last: FrameArenaPass) -> Option<Self> {
        (first <= last).then_some(Self { first, last })
    }

    /// A range covering one pass.
    pub const fn single(pass: FrameArenaPass) -> Self {
        Self { first: pass, last: pass }
    }

    pub fn first(&self) -> FrameArenaPass {
        self.first
    }

    pub fn last(&self) -> FrameArenaPass {
        self.last
    }

    /// Whether the two ranges share at least one pass.
    pub fn overlaps(&self, other: &PassRange) -> bool {
        !(self.last < other.first || other.last < self.first)
    }

    pub fn contains(&self, pass: FrameArenaPass) -> bool {
        self.first <= pass && pass <= self.last
    }
}

impl std::fmt::Display for PassRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.first.name(), self.last.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use FrameArenaPass::*;

    fn range(first: FrameArenaPass, last: FrameArenaPass) -> PassRange {
        PassRange::new(first, last).unwrap()
    }

    #[test]
    fn test_reversed_range_rejected() {
        assert!(PassRange::new(Post, Shadow).is_none());
        assert!(PassRange::new(Shadow, Shadow).is_some());
    }

    #[test]
    fn test_overlap() {
        assert!(range(Shadow, Main).overlaps(&range(Main, Post)));
        assert!(range(Prepass, Ui).overlaps(&PassRange::single(Ssao)));
        assert!(!range(Prepass, Shadow).overlaps(&range(Ssao, Ui)));
        assert!(!PassRange::single(Prepass).overlaps(&PassRange::single(Post)));
    }

    #[test]
    fn test_display() {
        assert_eq!(range(Shadow, Post).to_string(), "[shadow, post]");
        assert!(range(Shadow, Post).contains(Main));
    }
}
