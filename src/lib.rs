pub mod config;
pub mod evaluation;
pub mod llm;
pub mod palette;
pub mod prompts;
pub mod quiz;
pub mod tutor;
pub mod utils;

pub use quiz::clean_questions_text;
pub use tutor::Tutor;
