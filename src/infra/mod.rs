//! Infrastructure clients.

pub mod llm;
pub mod registry;

pub use llm::LlmClient;
pub use registry::RegistryClient;
