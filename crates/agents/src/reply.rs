use {async_trait::async_trait, tracing::info};

/// The external AI collaborator: given the agent's instructions and the
/// user's message, produce the reply text to append to the thread.
///
/// Implementations own their model access; the router only sees text in,
/// text out.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate(
        &self,
        thread_id: &str,
        instructions: &str,
        prompt: &str,
    ) -> anyhow::Result<String>;
}

/// Placeholder generator wired until a model backend is configured: echoes
/// the inbound text so the full pipeline stays exercisable end to end.
pub struct EchoReplyGenerator;

#[async_trait]
impl ReplyGenerator for EchoReplyGenerator {
    async fn generate(
        &self,
        thread_id: &str,
        _instructions: &str,
        prompt: &str,
    ) -> anyhow::Result<String> {
        info!(thread_id, prompt_len = prompt.len(), "generating echo reply");
        Ok(format!(
            "Echo: {}",
            if prompt.is_empty() { "(no text)" } else { prompt }
        ))
    }
}
