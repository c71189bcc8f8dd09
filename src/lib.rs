// Redraft - self-correcting content generation
// Library exports

pub mod config;
pub mod providers;
pub mod workflow;

pub use config::{load_config, load_config_from, Config};
pub use providers::{LlmProvider, ModelConfig, ModelHandle};
pub use workflow::{generate_content, Outcome, Workflow, WorkflowError};
