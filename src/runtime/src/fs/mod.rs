//! Path handling for build inputs.
//!
//! Every path that comes from a build script is confined to a root (the
//! build context on the host side, the unpacked rootfs on the image side)
//! through [`secure_join`] before it is touched.

mod clean;
mod copy;
mod securejoin;

pub use clean::clean;
pub use copy::{copy_into, copy_tree};
pub use securejoin::{secure_join, MAX_SYMLINK_LIMIT};
