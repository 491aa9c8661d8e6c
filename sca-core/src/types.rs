/// Identifier for a tip in a [`crate::tree::Tree`].
///
/// This is an index into `Tree::tips`. Tips are never removed, so an id stays
/// valid for the lifetime of the tree that issued it.
pub type TipId = usize;

/// Identifier for an attractor in a [`crate::attractor::AttractorSet`].
pub type AttractorId = usize;
