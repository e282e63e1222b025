// SPDX-FileCopyrightText: 2026 Convoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AI dispatch gate.
//!
//! Takes a user's combined (debounced) message and decides whether and how
//! an AI reply happens. The gate runs in order:
//!
//! 1. If the user's conversation has AI disabled, skip silently.
//! 2. Resolve tenant, agent, and credential; a hole in that chain is a
//!    configuration error.
//! 3. Check the owning team's billing state; an ended trial without an
//!    active subscription stops dispatch before any provider call and
//!    before any write.
//! 4. Ensure an OPEN conversation, call the provider with the agent's
//!    system prompt and recent conversation context, persist the reply,
//!    publish the internal event, and deliver the reply externally.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, warn};
use uuid::Uuid;

use convoy_config::DispatchConfig;
use convoy_conversation::ConversationManager;
use convoy_core::{
    ContextTurn, ConvoyError, InternalNotifier, MessageRecord, OutboundDelivery, ParticipantRole,
    ProviderFactory, RelayEvent, StoreAdapter,
};

/// What a successful dispatch produced.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub conversation_id: String,
    pub reply_message_id: String,
    pub reply_text: String,
}

pub struct AiDispatcher {
    store: Arc<dyn StoreAdapter>,
    conversations: Arc<ConversationManager>,
    factory: Arc<dyn ProviderFactory>,
    notifier: Arc<dyn InternalNotifier>,
    delivery: Arc<dyn OutboundDelivery>,
    config: DispatchConfig,
}

impl AiDispatcher {
    pub fn new(
        store: Arc<dyn StoreAdapter>,
        conversations: Arc<ConversationManager>,
        factory: Arc<dyn ProviderFactory>,
        notifier: Arc<dyn InternalNotifier>,
        delivery: Arc<dyn OutboundDelivery>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            store,
            conversations,
            factory,
            notifier,
            delivery,
            config,
        }
    }

    /// Run the gate for one combined message.
    ///
    /// Returns `Ok(None)` when dispatch was skipped on purpose (AI disabled
    /// on the conversation, or the provider returned an empty reply);
    /// `Err(ConvoyError::TrialExpired)` when billing stopped it; other
    /// errors for configuration holes and provider/delivery failures.
    pub async fn dispatch(
        &self,
        tenant_id: &str,
        user_id: &str,
        combined_text: &str,
    ) -> Result<Option<DispatchOutcome>, ConvoyError> {
        if let Some(existing) = self.store.find_open_conversation(user_id, tenant_id).await?
            && !existing.ai_enabled
        {
            debug!(
                conversation = %existing.id,
                user = %user_id,
                "AI disabled on conversation, skipping dispatch"
            );
            return Ok(None);
        }

        let tenant = self
            .store
            .get_tenant(tenant_id)
            .await?
            .ok_or_else(|| ConvoyError::Config(format!("tenant `{tenant_id}` not found")))?;
        let agent = self.store.get_agent(&tenant.agent_id).await?.ok_or_else(|| {
            ConvoyError::Config(format!("no agent configured for tenant `{tenant_id}`"))
        })?;
        let credential = self
            .store
            .get_credential(&agent.credential_id)
            .await?
            .ok_or_else(|| {
                ConvoyError::Config(format!("no API key found for agent `{}`", agent.id))
            })?;

        let owner = self.store.get_team_owner(&agent.team_id).await?.ok_or_else(|| {
            ConvoyError::Config(format!("team `{}` has no owner record", agent.team_id))
        })?;
        if owner.trial_expired(Utc::now()) {
            return Err(ConvoyError::TrialExpired {
                team_id: agent.team_id.clone(),
            });
        }

        let provider = self.factory.create(&agent, &credential.key)?;
        let conversation = self.conversations.ensure_open(user_id, tenant_id).await?;

        // Context is fetched before the combined message is attached, so the
        // provider sees it once, as the live message.
        let context: Vec<ContextTurn> = self
            .store
            .recent_messages(&conversation.id, self.config.context_window)
            .await?
            .into_iter()
            .map(|m| ContextTurn {
                role: m.sender,
                text: m.text,
            })
            .collect();

        let user_message = MessageRecord {
            id: Uuid::new_v4().to_string(),
            conversation_id: Some(conversation.id.clone()),
            sender: ParticipantRole::User,
            sender_id: user_id.to_string(),
            recipient_id: tenant_id.to_string(),
            text: combined_text.to_string(),
            metadata: Some(serde_json::json!({ "combined": true })),
            created_at: Utc::now(),
        };
        self.store.insert_message(&user_message).await?;

        let mut system_prompt = agent.system_prompt.trim().to_string();
        let suffix = self.config.system_prompt_suffix.trim();
        if !suffix.is_empty() {
            if !system_prompt.is_empty() {
                system_prompt.push(' ');
            }
            system_prompt.push_str(suffix);
        }

        let reply = provider
            .generate_reply(combined_text, Some(&system_prompt), &context)
            .await
            .inspect_err(|e| {
                error!(
                    tenant = %tenant_id,
                    user = %user_id,
                    error = %e,
                    "provider call failed"
                );
            })?;

        if reply.trim().is_empty() {
            warn!(tenant = %tenant_id, user = %user_id, "provider returned empty reply");
            return Ok(None);
        }

        let reply_message = MessageRecord {
            id: Uuid::new_v4().to_string(),
            conversation_id: Some(conversation.id.clone()),
            sender: ParticipantRole::Ai,
            sender_id: convoy_conversation::AI_PARTICIPANT_ID.to_string(),
            recipient_id: user_id.to_string(),
            text: reply.clone(),
            metadata: Some(serde_json::json!({
                "is_ai_reply": true,
                "model": agent.model,
                "tenant_id": tenant_id,
                "agent_title": agent.title,
            })),
            created_at: Utc::now(),
        };
        self.store.insert_message(&reply_message).await?;

        let event = RelayEvent::AiReply {
            message_id: reply_message.id.clone(),
            conversation_id: conversation.id.clone(),
            tenant_id: tenant_id.to_string(),
            recipient_id: user_id.to_string(),
            text: reply.clone(),
            agent_title: agent.title.clone(),
            model: agent.model.clone(),
            timestamp: reply_message.created_at,
        };
        if let Err(e) = self.notifier.publish(event).await {
            // Subscribers are best effort; the user still gets their reply.
            warn!(error = %e, "failed to publish AI reply event");
        }

        self.delivery
            .send_text(tenant_id, user_id, &reply)
            .await
            .inspect_err(|e| {
                error!(
                    tenant = %tenant_id,
                    user = %user_id,
                    error = %e,
                    "external delivery of AI reply failed"
                );
            })?;

        Ok(Some(DispatchOutcome {
            conversation_id: conversation.id,
            reply_message_id: reply_message.id,
            reply_text: reply,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use convoy_core::{
        AgentRecord, Credential, ProviderKind, TeamOwner, TenantRecord,
    };
    use convoy_store::InMemoryStore;
    use convoy_test_utils::{MockProvider, MockProviderFactory, RecordingNotifier};
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingDelivery {
        sent: Mutex<Vec<(String, String, String)>>,
        fail: std::sync::atomic::AtomicBool,
    }

    impl RecordingDelivery {
        async fn sent(&self) -> Vec<(String, String, String)> {
            self.sent.lock().await.clone()
        }
    }

    #[async_trait]
    impl OutboundDelivery for RecordingDelivery {
        async fn send_text(
            &self,
            tenant_id: &str,
            recipient_id: &str,
            text: &str,
        ) -> Result<(), ConvoyError> {
            if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(ConvoyError::channel("scripted delivery failure"));
            }
            self.sent.lock().await.push((
                tenant_id.to_string(),
                recipient_id.to_string(),
                text.to_string(),
            ));
            Ok(())
        }
    }

    struct Fixture {
        store: Arc<InMemoryStore>,
        provider: Arc<MockProvider>,
        notifier: Arc<RecordingNotifier>,
        delivery: Arc<RecordingDelivery>,
        dispatcher: AiDispatcher,
    }

    async fn fixture_with_owner(owner: TeamOwner) -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        store
            .create_tenant(&TenantRecord {
                tenant_id: "acme-1".to_string(),
                display_name: "acme".to_string(),
                server_url: "wss://chat.example.net".to_string(),
                team_id: "team-1".to_string(),
                agent_id: "agent-1".to_string(),
                active: true,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        store
            .put_agent(AgentRecord {
                id: "agent-1".to_string(),
                title: "Support Bot".to_string(),
                provider: ProviderKind::OpenAi,
                model: Some("gpt-4o-mini".to_string()),
                temperature: None,
                max_tokens: None,
                team_id: "team-1".to_string(),
                system_prompt: "You are a support agent.".to_string(),
                credential_id: "cred-1".to_string(),
            })
            .await;
        store
            .put_credential(Credential {
                id: "cred-1".to_string(),
                key: "sk-test".to_string(),
            })
            .await;
        store.put_team_owner("team-1", owner).await;

        let provider = Arc::new(MockProvider::new());
        let factory = Arc::new(MockProviderFactory::new(Arc::clone(&provider)));
        let notifier = Arc::new(RecordingNotifier::new());
        let delivery = Arc::new(RecordingDelivery::default());
        let conversations = Arc::new(ConversationManager::new(
            Arc::clone(&store) as Arc<dyn StoreAdapter>
        ));
        let dispatcher = AiDispatcher::new(
            Arc::clone(&store) as Arc<dyn StoreAdapter>,
            conversations,
            factory,
            Arc::clone(&notifier) as Arc<dyn InternalNotifier>,
            Arc::clone(&delivery) as Arc<dyn OutboundDelivery>,
            DispatchConfig::default(),
        );
        Fixture {
            store,
            provider,
            notifier,
            delivery,
            dispatcher,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with_owner(TeamOwner {
            trial_end_date: Some(Utc::now() + Duration::days(7)),
            subscription_status: None,
        })
        .await
    }

    #[tokio::test]
    async fn happy_path_persists_notifies_and_delivers() {
        let f = fixture().await;
        f.provider.queue_reply("Here to help!").await;

        let outcome = f
            .dispatcher
            .dispatch("acme-1", "user-1", "Hello\nhow are you")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.reply_text, "Here to help!");

        // Combined user message plus AI reply were persisted.
        assert_eq!(f.store.message_count().await, 2);

        let events = f.notifier.events().await;
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], RelayEvent::AiReply { text, .. } if text == "Here to help!"));

        let sent = f.delivery.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "acme-1");
        assert_eq!(sent[0].1, "user-1");
        assert_eq!(sent[0].2, "Here to help!");

        // The agent's stored prompt got the configured style suffix.
        let calls = f.provider.calls().await;
        let prompt = calls[0].system_prompt.clone().unwrap();
        assert!(prompt.starts_with("You are a support agent."));
        assert!(prompt.len() > "You are a support agent.".len());
    }

    #[tokio::test]
    async fn trial_expired_stops_before_provider_and_writes() {
        let f = fixture_with_owner(TeamOwner {
            trial_end_date: Some(Utc::now() - Duration::days(1)),
            subscription_status: Some("canceled".to_string()),
        })
        .await;

        let err = f.dispatcher.dispatch("acme-1", "user-1", "hi").await.unwrap_err();
        assert!(matches!(err, ConvoyError::TrialExpired { team_id } if team_id == "team-1"));
        assert_eq!(f.provider.call_count().await, 0);
        assert_eq!(f.store.message_count().await, 0);
        assert_eq!(f.notifier.event_count().await, 0);
        assert!(f.delivery.sent().await.is_empty());
    }

    #[tokio::test]
    async fn active_subscription_survives_ended_trial() {
        let f = fixture_with_owner(TeamOwner {
            trial_end_date: Some(Utc::now() - Duration::days(30)),
            subscription_status: Some("active".to_string()),
        })
        .await;
        f.provider.queue_reply("still here").await;

        let outcome = f.dispatcher.dispatch("acme-1", "user-1", "hi").await.unwrap();
        assert!(outcome.is_some());
    }

    #[tokio::test]
    async fn ai_disabled_conversation_is_skipped_silently() {
        let f = fixture().await;

        // Open a conversation, then flip its AI flag off.
        let conversations =
            ConversationManager::new(Arc::clone(&f.store) as Arc<dyn StoreAdapter>);
        let mut conversation = conversations.ensure_open("user-1", "acme-1").await.unwrap();
        conversation.ai_enabled = false;
        f.store.update_conversation(&conversation).await.unwrap();

        let outcome = f.dispatcher.dispatch("acme-1", "user-1", "hi").await.unwrap();
        assert!(outcome.is_none());
        assert_eq!(f.provider.call_count().await, 0);
        assert_eq!(f.store.message_count().await, 0);
    }

    #[tokio::test]
    async fn missing_credential_is_a_config_error() {
        let f = fixture().await;
        // Point the agent at a credential that does not exist.
        f.store
            .put_agent(AgentRecord {
                id: "agent-1".to_string(),
                title: "Support Bot".to_string(),
                provider: ProviderKind::OpenAi,
                model: None,
                temperature: None,
                max_tokens: None,
                team_id: "team-1".to_string(),
                system_prompt: String::new(),
                credential_id: "cred-missing".to_string(),
            })
            .await;

        let err = f.dispatcher.dispatch("acme-1", "user-1", "hi").await.unwrap_err();
        assert!(matches!(err, ConvoyError::Config(_)));
        assert_eq!(f.provider.call_count().await, 0);
    }

    #[tokio::test]
    async fn delivery_failure_propagates_after_persistence() {
        let f = fixture().await;
        f.provider.queue_reply("lost reply").await;
        f.delivery.fail.store(true, std::sync::atomic::Ordering::SeqCst);

        let err = f.dispatcher.dispatch("acme-1", "user-1", "hi").await.unwrap_err();
        assert!(matches!(err, ConvoyError::Channel { .. }));
        // The reply was persisted and announced before the send failed.
        assert_eq!(f.store.message_count().await, 2);
        assert_eq!(f.notifier.event_count().await, 1);
    }

    #[tokio::test]
    async fn second_dispatch_carries_prior_turns_as_context() {
        let f = fixture().await;
        f.provider.queue_reply("first answer").await;
        f.provider.queue_reply("second answer").await;

        f.dispatcher.dispatch("acme-1", "user-1", "first question").await.unwrap();
        f.dispatcher.dispatch("acme-1", "user-1", "second question").await.unwrap();

        let calls = f.provider.calls().await;
        assert_eq!(calls[0].context_len, 0);
        // First question and first answer are now history.
        assert_eq!(calls[1].context_len, 2);
    }

    #[tokio::test]
    async fn empty_reply_is_not_delivered() {
        let f = fixture().await;
        f.provider.queue_reply("   ").await;

        let outcome = f.dispatcher.dispatch("acme-1", "user-1", "hi").await.unwrap();
        assert!(outcome.is_none());
        assert!(f.delivery.sent().await.is_empty());
        // Only the combined user message was persisted.
        assert_eq!(f.store.message_count().await, 1);
    }
}
