pub mod llm_provider;
pub mod narration;
