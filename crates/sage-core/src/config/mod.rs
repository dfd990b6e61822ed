mod env;
mod types;

#[cfg(test)]
mod tests;

pub use types::*;

use std::path::Path;

use anyhow::{Context, bail};

use crate::vault::{Secret, VaultProvider};

pub const API_KEY_VAR: &str = "SAGE_LLM_API_KEY";

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Reject settings that would make the pipeline misbehave.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rag.chunk_size == 0 {
            bail!("rag.chunk_size must be greater than 0");
        }
        if self.rag.chunk_overlap >= self.rag.chunk_size {
            bail!(
                "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
                self.rag.chunk_overlap,
                self.rag.chunk_size
            );
        }
        if self.embedding.dimension == 0 {
            bail!("embedding.dimension must be greater than 0");
        }
        if self.mcp.connect_attempts == 0 {
            bail!("mcp.connect_attempts must be at least 1");
        }
        if self.mcp.timeout_secs == 0 {
            bail!("mcp.timeout_secs must be greater than 0");
        }
        if self.mcp.transport == TransportKind::Http && self.mcp.url.trim().is_empty() {
            bail!("mcp.url is required for the http transport");
        }
        if !self.server.path.starts_with('/') {
            bail!("server.path must start with '/', got {:?}", self.server.path);
        }
        if self.store.knowledge_collection == self.store.faq_collection {
            bail!("store.knowledge_collection and store.faq_collection must differ");
        }
        if let Some(t) = self.store.score_threshold
            && !(-1.0..=1.0).contains(&t)
        {
            bail!("store.score_threshold must be within [-1, 1], got {t}");
        }
        Ok(())
    }

    /// Resolve credentials through the vault.
    ///
    /// # Errors
    ///
    /// Returns an error if the vault backend fails.
    pub async fn resolve_secrets(&mut self, vault: &dyn VaultProvider) -> anyhow::Result<()> {
        if let Some(val) = vault.get_secret(API_KEY_VAR).await? {
            self.secrets.llm_api_key = Some(Secret::new(val));
        }
        Ok(())
    }
}
