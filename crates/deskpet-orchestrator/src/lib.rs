//! Chat Orchestrator (C9) and Context Assembler (C5): the single place a
//! channel/gateway layer calls to run one full chat turn.

pub mod assembler;
pub mod error;
pub mod orchestrator;
pub mod types;

pub use assembler::{assemble_context, load_pet_config, DEFAULT_PET_NAME, DEFAULT_PET_SYSTEM_PROMPT};
pub use error::translate_error;
pub use orchestrator::{handle_chat_turn, OrchestratorDeps};
pub use types::ChatTurnResult;
