use std::sync::Arc;

use tracing::{info, warn};

use {
    switchboard_agents::{AgentStore, AiAgent, ReplyGenerator, select_agent_for_channel},
    switchboard_channels::{
        ChannelType, ConnectionStore, Error as ChannelError, InboundMessage, NewWebhookLogEntry,
        SendReceipt, WebhookLog,
    },
    switchboard_common::{OrgContext, now_ms},
    switchboard_sessions::{
        ContactSessionStore, Conversation, ConversationStatus, ConversationStore, MessageRole,
        NewContactSession, NewConversation, ThreadLog,
    },
};

use crate::{
    error::{Error, Result},
    outbound::OutboundDispatcher,
    settings::SettingsStore,
};

/// Everything the router talks to. All seams are traits so the pipeline is
/// testable without a network.
pub struct RouterServices {
    pub connections: Arc<dyn ConnectionStore>,
    pub contacts: Arc<dyn ContactSessionStore>,
    pub conversations: Arc<dyn ConversationStore>,
    pub threads: Arc<dyn ThreadLog>,
    pub agents: Arc<dyn AgentStore>,
    pub settings: Arc<dyn SettingsStore>,
    pub reply: Arc<dyn ReplyGenerator>,
    pub outbound: OutboundDispatcher,
    pub webhook_log: Arc<dyn WebhookLog>,
}

/// The conversation router.
pub struct Router {
    services: RouterServices,
}

impl Router {
    pub fn new(services: RouterServices) -> Self {
        Self { services }
    }

    /// Process one normalized inbound event end to end.
    ///
    /// Every outcome is recorded in the webhook log; errors are re-raised
    /// after logging so the worker can surface them, but by then the
    /// webhook HTTP response has long been sent.
    pub async fn handle_inbound(&self, event: InboundMessage) -> Result<()> {
        match self.run_pipeline(&event).await {
            Ok(()) => {
                self.services
                    .webhook_log
                    .record(NewWebhookLogEntry::success(
                        &event.organization_id,
                        event.channel,
                        "message",
                        serde_json::json!({
                            "channel_user_id": event.external_user_id,
                            "external_message_id": event.external_message_id,
                        }),
                    ))
                    .await?;
                Ok(())
            },
            Err(e) => {
                warn!(
                    channel = %event.channel,
                    organization_id = %event.organization_id,
                    error = %e,
                    "inbound pipeline failed"
                );
                let payload = serde_json::to_value(&event).unwrap_or_default();
                self.services
                    .webhook_log
                    .record(NewWebhookLogEntry::failure(
                        &event.organization_id,
                        event.channel,
                        "message",
                        &e,
                        payload,
                    ))
                    .await?;
                Err(e)
            },
        }
    }

    async fn run_pipeline(&self, event: &InboundMessage) -> Result<()> {
        // 1. Contact identity: one atomic upsert, idempotent under
        // concurrent deliveries.
        let session = self
            .services
            .contacts
            .resolve_or_create(NewContactSession {
                organization_id: event.organization_id.clone(),
                channel: event.channel,
                channel_user_id: event.external_user_id.clone(),
                name: event.sender_name.clone(),
                profile_picture_url: None,
            })
            .await?;

        // 2. Conversation, seeded with the greeting when newly created.
        let thread_id = format!(
            "{}_{}_{}_{}",
            event.channel,
            event.organization_id,
            event.external_user_id,
            now_ms()
        );
        let (conversation, created) = self
            .services
            .conversations
            .create_if_absent(NewConversation {
                thread_id,
                organization_id: event.organization_id.clone(),
                contact_session_id: session.id.clone(),
            })
            .await?;
        if created {
            let greeting = self
                .services
                .settings
                .greeting(&event.organization_id)
                .await?;
            self.services
                .threads
                .append(&conversation.thread_id, MessageRole::Assistant, &greeting)
                .await?;
        }

        // 3. A new inbound message reopens a closed ticket.
        if conversation.status == ConversationStatus::Resolved {
            self.services
                .conversations
                .reopen_if_resolved(&conversation.id)
                .await?;
        }

        // 4. Record the user's message.
        self.services
            .threads
            .append(&conversation.thread_id, MessageRole::User, &event.text)
            .await?;

        // 5. Escalated conversations belong to a human; no automated reply.
        if conversation.status == ConversationStatus::Escalated {
            info!(
                conversation_id = %conversation.id,
                "conversation escalated, suppressing automated reply"
            );
            return Ok(());
        }

        // 6. Who answers here?
        let Some(agent) = self.select_agent(event, &conversation).await? else {
            info!(
                organization_id = %event.organization_id,
                channel = %event.channel,
                "no active agent, skipping automated reply"
            );
            return Ok(());
        };

        // 7. Generate and record the reply.
        let reply_text = self
            .services
            .reply
            .generate(&conversation.thread_id, &agent.instructions, &event.text)
            .await
            .map_err(Error::reply)?;
        self.services
            .threads
            .append(&conversation.thread_id, MessageRole::Assistant, &reply_text)
            .await?;

        // 8. Dispatch through the adapter for the inbound channel.
        let connection = self
            .services
            .connections
            .get_active(&event.organization_id, event.channel)
            .await?
            .ok_or_else(|| ChannelError::not_found(event.channel))?;
        let adapter = self.services.outbound.adapter(event.channel)?;
        let receipt = adapter
            .send_message(&connection, &event.external_user_id, &reply_text)
            .await?;
        info!(
            conversation_id = %conversation.id,
            message_id = %receipt.message_id,
            "automated reply dispatched"
        );
        Ok(())
    }

    async fn select_agent(
        &self,
        event: &InboundMessage,
        conversation: &Conversation,
    ) -> Result<Option<AiAgent>> {
        // Explicit per-conversation override first.
        if let Some(ref agent_id) = conversation.agent_id
            && let Some(agent) = self
                .services
                .agents
                .get(&event.organization_id, agent_id)
                .await?
            && agent.is_active
        {
            return Ok(Some(agent));
        }
        Ok(select_agent_for_channel(
            self.services.agents.as_ref(),
            &event.organization_id,
            event.channel,
        )
        .await?)
    }

    /// Human-operator outbound path (dashboard reply). Bypasses agent
    /// selection entirely; the message is appended to the thread as an
    /// operator message when the contact has a conversation.
    pub async fn send_outbound(
        &self,
        ctx: &OrgContext,
        channel: ChannelType,
        external_user_id: &str,
        text: &str,
    ) -> Result<SendReceipt> {
        let connection = self
            .services
            .connections
            .get_active(&ctx.organization_id, channel)
            .await?
            .ok_or_else(|| ChannelError::not_found(channel))?;
        let adapter = self.services.outbound.adapter(channel)?;
        let receipt = adapter.send_message(&connection, external_user_id, text).await?;

        if let Some(session) = self
            .services
            .contacts
            .get_by_identity(channel, external_user_id, &ctx.organization_id)
            .await?
            && let Some(conversation) = self
                .services
                .conversations
                .get_by_contact_session(&session.id)
                .await?
        {
            self.services
                .threads
                .append(&conversation.thread_id, MessageRole::Operator, text)
                .await?;
        }
        Ok(receipt)
    }

    /// Human takeover: stop automated replies for this conversation.
    pub async fn escalate(&self, ctx: &OrgContext, conversation_id: &str) -> Result<()> {
        self.services
            .conversations
            .set_status(conversation_id, &ctx.organization_id, ConversationStatus::Escalated)
            .await?;
        Ok(())
    }

    /// Close the conversation. A later inbound message reopens it.
    pub async fn resolve(&self, ctx: &OrgContext, conversation_id: &str) -> Result<()> {
        self.services
            .conversations
            .set_status(conversation_id, &ctx.organization_id, ConversationStatus::Resolved)
            .await?;
        Ok(())
    }
}
