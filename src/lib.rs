//! Read-only consistency checker for xv6 file system images.
//!
//! ```no_run
//! use xcheck::{check_image, Layout};
//!
//! let bytes = std::fs::read("fs.img").unwrap();
//! match check_image(&bytes, Layout::default()) {
//!     Ok(()) => println!("done"),
//!     Err(e) => println!("{}", e),
//! }
//! ```

pub mod block {
    pub mod bitmap;
    pub mod inode;
    pub mod sblock;
}
pub mod builder;
pub mod check;
pub mod converter;
pub mod error;
pub mod file;
pub mod index;
pub mod initializer;
pub mod subcommand;
pub mod types;
pub mod utils;

pub use crate::check::{check_image, Checker};
pub use crate::error::{AddressKind, BuildError, CheckError, ImageError, Violation, XcheckError};
pub use crate::types::Layout;
pub use crate::utils::FsView;
