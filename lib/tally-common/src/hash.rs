//! Hashing primitives.

/// A fast, non-cryptographic hash implementation that is optimized for quality.
///
/// Currently, [`foldhash`][foldhash] is used as the underlying implementation.
///
/// [foldhash]: http://github.com/orlp/foldhash
pub type FastHasher = foldhash::quality::FoldHasher;

/// [`BuildHasher`][std::hash::BuildHasher] implementation for [`FastHasher`].
pub type FastBuildHasher = foldhash::quality::RandomState;

/// Returns a fresh, randomly-seeded `FastBuildHasher`.
#[inline]
pub fn get_fast_build_hasher() -> FastBuildHasher {
    foldhash::quality::RandomState::default()
}
