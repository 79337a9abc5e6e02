pub mod config;
pub mod console;
pub mod openai_dialogue;
pub mod prompt_loader;
pub mod question_bank;
