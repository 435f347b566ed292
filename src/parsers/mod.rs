pub mod ripgrep_output;
pub mod span_locator;

pub use ripgrep_output::{parse, parse_line, GROUP_SEPARATOR};
pub use span_locator::{merge_spans, SpanLocator};
