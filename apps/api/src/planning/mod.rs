// Study-plan pipeline: marks parsing, prompt construction, JSON recovery,
// fallback scheduling, and response normalization.
// All completion calls go through llm_client — no direct service calls here.

pub mod extractor;
pub mod fallback;
pub mod handlers;
pub mod marks;
pub mod normalizer;
pub mod prompts;
