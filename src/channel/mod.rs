//! Channel layer: output buffering, prompt detection and output
//! classification.

mod buffer;
mod patterns;

pub use buffer::PatternBuffer;
pub use patterns::{
    Classification, PatternSets, PromptMatcher, compile_prompt_check, normalize_output,
};
