pub mod accessor;
pub mod build;
pub mod lines;
pub mod reader;
pub mod stats;
pub mod types;

pub use accessor::{LineAccessor, Page};
pub use build::LineIndexBuilder;
pub use lines::{split_lines, strip_terminators, Line, Terminator};
pub use reader::{ByteSource, ChunkReader, FileSource, MemorySource, MmapSource};
pub use types::*;
