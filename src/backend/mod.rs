//! Text generation backends: hosted chat completion or a local model CLI.

pub mod hosted;
pub mod local;

use crate::config::Config;
use crate::report::prompt::Prompt;
use crate::utils::{BackendError, BackendKind};

pub use hosted::HostedChat;
pub use local::LocalCli;

pub trait Generate {
    fn kind(&self) -> BackendKind;

    /// Prompt in, response text out. Any error is fatal to the run.
    fn generate(&self, prompt: &Prompt) -> Result<String, BackendError>;
}

pub enum Backend {
    Hosted(HostedChat),
    Local(LocalCli),
}

impl Backend {
    /// Picks the variant named by `config.backend_kind`; the other one is
    /// never constructed.
    pub fn from_config(config: &Config) -> Result<Self, BackendError> {
        match config.backend_kind {
            BackendKind::Hosted => Ok(Backend::Hosted(HostedChat::new(
                &config.api_base_url,
                config.api_key.clone(),
                &config.hosted_model,
                config.backend_timeout,
            )?)),
            BackendKind::Local => Ok(Backend::Local(LocalCli::new(
                &config.local_program,
                &config.local_model,
                config.backend_timeout,
            ))),
        }
    }
}

impl Generate for Backend {
    fn kind(&self) -> BackendKind {
        match self {
            Backend::Hosted(b) => b.kind(),
            Backend::Local(b) => b.kind(),
        }
    }

    fn generate(&self, prompt: &Prompt) -> Result<String, BackendError> {
        match self {
            Backend::Hosted(b) => b.generate(prompt),
            Backend::Local(b) => b.generate(prompt),
        }
    }
}
