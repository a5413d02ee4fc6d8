//! Wire-adjacent data types.

pub mod prompt;

pub use prompt::{
    Chunk, ChunkedPrompt, Content, GenerateContentDocument, GenerationConfig, Part,
    RunSettings, StudioPromptDocument,
};
