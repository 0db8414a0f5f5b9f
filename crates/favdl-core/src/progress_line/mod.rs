//! Line framing and progress extraction for downloader console output.
//!
//! Downloaders redraw their progress bar in place with `\r`, so a bare
//! carriage return is a line boundary just like `\n`. `\r\n` counts once.
//! Lines are decoded as UTF-8, falling back to GBK for tools that write in
//! the console's locale encoding.

mod decode;
mod percent;
mod reader;

pub use decode::decode_line;
pub use percent::{parse_fraction, parse_percent};
pub use reader::LineReader;
