//! FilterLab: open an image, stack color and contrast filters on it, step
//! back and forth through the stack and save the result at full resolution.
//!
//! [`EditSession`] is the entry point for library use; [`SessionRunner`]
//! runs its commands on a background pool.

#[macro_use]
pub mod logger;

pub mod canvas;
pub mod cli;
pub mod error;
pub mod history;
pub mod io;
pub mod ops;
pub mod session;
pub mod settings;
pub mod worker;

pub use canvas::PixelBuffer;
pub use error::{EditError, Result, Transition};
pub use history::FilterHistory;
pub use io::{MaxDimensions, SaveFormat};
pub use ops::{ColorFilter, ContrastFilter, Filter, FilterKind, PixelFilter, replay};
pub use session::{Command, EditSession, SessionOptions};
pub use settings::EditorSettings;
pub use worker::{JobReport, SessionRunner};
