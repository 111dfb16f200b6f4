// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-message processing: access, voice, draw commands and questions.
//!
//! Every failure here degrades the reply instead of surfacing an error: a
//! failed transcription leaves nothing to answer, a failed image is reported
//! in the reply text, and a failed speech synthesis only omits the voice note.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use chloe_config::ChloeConfig;
use chloe_core::types::{InboundMessage, MediaFile, UserProfile};
use chloe_core::{
    ChatHandle, ChloeError, CompletionProvider, ImageGenerator, MessageId, SpeechSynthesizer,
    Transcriber,
};

use crate::access::AccessGate;
use crate::addressing::{AddressingClassifier, DrawCommand};
use crate::conversation::ConversationSettings;
use crate::gateway::{CompletionGateway, GatewayPolicy};
use crate::store::ConversationStore;

/// Reply to users who may not chat with the assistant here.
pub const DENIED_CHAT: &str = "Sorry, this AI assistant is not allowed in this conversation. \
     Please contact the administrator for access.";

/// Reply to users who may not request images here.
pub const DENIED_DRAW: &str = "Sorry, AI assistant is not allowed to draw in this conversation. \
     Please contact the administrator for access.";

/// Prefix of the quoted transcript in voice replies.
const TRANSCRIPT_QUOTE: &str = "Transcription:\n";

/// Optional voice and image collaborators.
#[derive(Clone, Default)]
pub struct MediaServices {
    pub transcriber: Option<Arc<dyn Transcriber>>,
    pub synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    pub images: Option<Arc<dyn ImageGenerator>>,
}

/// An inbound message whose sender, chat and id are known to be present.
pub struct Incoming {
    pub id: MessageId,
    pub sender: UserProfile,
    pub chat: Arc<dyn ChatHandle>,
    pub text: String,
    pub voice: Option<MediaFile>,
}

impl Incoming {
    /// Validate a raw message. The error names what was missing.
    pub fn from_message(message: InboundMessage) -> Result<Self, &'static str> {
        let InboundMessage {
            id,
            sender,
            chat,
            text,
            voice,
            ..
        } = message;
        let sender = sender.ok_or("missing sender")?;
        let chat = chat.ok_or("missing chat")?;
        if id.is_empty() {
            return Err("empty message id");
        }
        if sender.id.is_empty() {
            return Err("empty user id");
        }
        if chat.id().is_empty() {
            return Err("empty chat id");
        }
        Ok(Self {
            id,
            sender,
            chat,
            text,
            voice,
        })
    }
}

pub struct MessageHandler {
    access: AccessGate,
    classifier: AddressingClassifier,
    store: ConversationStore,
    gateway: CompletionGateway,
    media: MediaServices,
}

impl MessageHandler {
    pub fn new(
        access: AccessGate,
        classifier: AddressingClassifier,
        store: ConversationStore,
        gateway: CompletionGateway,
        media: MediaServices,
    ) -> Self {
        Self {
            access,
            classifier,
            store,
            gateway,
            media,
        }
    }

    pub fn from_config(
        config: &ChloeConfig,
        provider: Arc<dyn CompletionProvider>,
        media: MediaServices,
    ) -> Self {
        Self::new(
            AccessGate::new(&config.access),
            AddressingClassifier::new(config.agent.name.clone()),
            ConversationStore::new(ConversationSettings::from_config(config)),
            CompletionGateway::new(provider, GatewayPolicy::from_config(&config.openai)),
            media,
        )
    }

    pub fn access(&self) -> &AccessGate {
        &self.access
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Process one message. `allowed` is the access decision for its sender and chat.
    pub async fn handle(&self, incoming: Incoming, allowed: bool) {
        let Incoming {
            id,
            sender,
            chat,
            text,
            voice,
        } = incoming;

        let members = chat.member_count().await;
        if members <= 2 && !allowed {
            info!(user_id = %sender.id, chat_id = %chat.id(), "access denied in direct chat");
            chat.reply_message(DENIED_CHAT, &id).await;
            return;
        }

        let text = match &voice {
            Some(audio) => self.transcribe(audio.path()).await,
            None => text,
        };
        if text.trim().is_empty() {
            debug!(user_id = %sender.id, chat_id = %chat.id(), "nothing to answer");
            return;
        }

        if let Some(command) = self.classifier.parse_command(&text) {
            self.draw(chat.as_ref(), &sender, &id, command, allowed).await;
            return;
        }

        if !self.classifier.is_addressed(&text, members, chat.bot_username()) {
            return;
        }
        if !allowed {
            info!(user_id = %sender.id, chat_id = %chat.id(), "access denied");
            chat.reply_message(DENIED_CHAT, &id).await;
            return;
        }

        info!(user = %sender.username, user_id = %sender.id, chat_id = %chat.id(), "received question");
        let context = self.store.get_or_create(chat.id());
        let answer = {
            let mut context = context.lock().await;
            self.gateway.ask(&mut context, &text).await
        };

        if voice.is_none() {
            chat.reply_message(&answer, &id).await;
        } else {
            chat.quote_message(&answer, &id, &format!("{TRANSCRIPT_QUOTE}{text}"))
                .await;
            self.speak(chat.as_ref(), &answer, &id).await;
        }
        info!(user = %sender.username, chat_id = %chat.id(), "replied");
    }

    async fn transcribe(&self, audio: &Path) -> String {
        let Some(transcriber) = &self.media.transcriber else {
            warn!("voice message received but no transcriber is configured");
            return String::new();
        };
        match transcriber.transcribe(audio).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "speech to text failed");
                String::new()
            }
        }
    }

    async fn draw(
        &self,
        chat: &dyn ChatHandle,
        sender: &UserProfile,
        id: &MessageId,
        command: DrawCommand,
        allowed: bool,
    ) {
        debug!(user = %sender.username, size = %command.size, "received image request");
        if !allowed {
            info!(user_id = %sender.id, chat_id = %chat.id(), "draw denied");
            chat.reply_message(DENIED_DRAW, id).await;
            return;
        }

        let generated = match &self.media.images {
            Some(images) => images.generate(&command.description, command.size).await,
            None => Err(ChloeError::ImageGeneration {
                message: "no image generator is configured".into(),
            }),
        };
        match generated {
            Ok(image) => chat.reply_image(image.path(), id).await,
            Err(ChloeError::ImageGeneration { message }) => {
                warn!(error = %message, "image generation failed");
                chat.reply_message(&message, id).await;
            }
            Err(e) => {
                warn!(error = %e, "image generation failed");
                chat.reply_message(&e.to_string(), id).await;
            }
        }
    }

    async fn speak(&self, chat: &dyn ChatHandle, answer: &str, id: &MessageId) {
        let Some(synthesizer) = &self.media.synthesizer else {
            debug!("no speech synthesizer configured, skipping voice reply");
            return;
        };
        match synthesizer.synthesize(answer).await {
            Ok(audio) => chat.reply_voice(audio.path(), id).await,
            Err(e) => warn!(error = %e, "text to speech failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use chloe_core::types::{ImageSize, Role};
    use chloe_test_utils::{
        MockChat, MockImageGenerator, MockSynthesizer, MockTranscriber, Reply, ScriptedProvider,
        Step, text_message, user, voice_message,
    };

    use crate::gateway::APOLOGY;

    fn handler(provider: ScriptedProvider, media: MediaServices) -> MessageHandler {
        MessageHandler::from_config(&ChloeConfig::default(), Arc::new(provider), media)
    }

    fn incoming(message: InboundMessage) -> Incoming {
        Incoming::from_message(message).unwrap()
    }

    #[tokio::test]
    async fn denied_direct_chat_gets_denial() {
        let provider = ScriptedProvider::new();
        let handler = handler(provider.clone(), MediaServices::default());
        let chat = MockChat::direct("tg-1");

        handler
            .handle(incoming(text_message(&chat, &user("tg-9", "eve"), "hi")), false)
            .await;

        assert_eq!(chat.texts().await, vec![DENIED_CHAT]);
        assert_eq!(provider.call_count().await, 0);
    }

    #[tokio::test]
    async fn allowed_direct_chat_gets_answer() {
        let provider = ScriptedProvider::with_replies(["hello back"]);
        let handler = handler(provider, MediaServices::default());
        let chat = MockChat::direct("tg-1");
        let msg = text_message(&chat, &user("tg-9", "eve"), "hello");
        let msg_id = msg.id.clone();

        handler.handle(incoming(msg), true).await;

        let replies = chat.replies().await;
        assert_eq!(
            replies,
            vec![Reply::Text {
                text: "hello back".into(),
                to: msg_id
            }]
        );
    }

    #[tokio::test]
    async fn unaddressed_group_message_is_ignored_even_when_denied() {
        let provider = ScriptedProvider::new();
        let handler = handler(provider.clone(), MediaServices::default());
        let chat = MockChat::group("tg-100");

        handler
            .handle(incoming(text_message(&chat, &user("tg-9", "eve"), "lunch?")), false)
            .await;

        assert!(chat.replies().await.is_empty());
        assert_eq!(provider.call_count().await, 0);
    }

    #[tokio::test]
    async fn addressed_group_message_from_denied_user_is_refused() {
        let handler = handler(ScriptedProvider::new(), MediaServices::default());
        let chat = MockChat::group("tg-100");

        handler
            .handle(incoming(text_message(&chat, &user("tg-9", "eve"), "@chloe_bot hi")), false)
            .await;

        assert_eq!(chat.texts().await, vec![DENIED_CHAT]);
    }

    #[tokio::test]
    async fn draw_command_replies_with_image() {
        let images = MockImageGenerator::new();
        let media = MediaServices {
            images: Some(images.clone()),
            ..MediaServices::default()
        };
        let handler = handler(ScriptedProvider::new(), media);
        let chat = MockChat::group("tg-100");

        handler
            .handle(
                incoming(text_message(&chat, &user("tg-9", "eve"), "/drawbig a sunset")),
                true,
            )
            .await;

        assert_eq!(
            images.requests().await,
            vec![("a sunset".to_string(), ImageSize::Large)]
        );
        let replies = chat.replies().await;
        assert!(matches!(&replies[..], [Reply::Image { existed: true, .. }]));
        let produced = images.produced().await;
        assert!(!produced[0].exists(), "image file must be released after delivery");
    }

    #[tokio::test]
    async fn denied_draw_gets_draw_denial() {
        let images = MockImageGenerator::new();
        let media = MediaServices {
            images: Some(images.clone()),
            ..MediaServices::default()
        };
        let handler = handler(ScriptedProvider::new(), media);
        let chat = MockChat::group("tg-100");

        handler
            .handle(incoming(text_message(&chat, &user("tg-9", "eve"), "/draw a cat")), false)
            .await;

        assert_eq!(chat.texts().await, vec![DENIED_DRAW]);
        assert!(images.requests().await.is_empty());
    }

    #[tokio::test]
    async fn image_failure_is_relayed() {
        let media = MediaServices {
            images: Some(MockImageGenerator::failing("content policy violation")),
            ..MediaServices::default()
        };
        let handler = handler(ScriptedProvider::new(), media);
        let chat = MockChat::direct("tg-1");

        handler
            .handle(incoming(text_message(&chat, &user("tg-9", "eve"), "/draw a cat")), true)
            .await;

        assert_eq!(chat.texts().await, vec!["content policy violation"]);
    }

    #[tokio::test]
    async fn voice_question_is_quoted_and_spoken() {
        let synthesizer = MockSynthesizer::new();
        let media = MediaServices {
            transcriber: Some(MockTranscriber::returning("what time is it")),
            synthesizer: Some(synthesizer.clone()),
            images: None,
        };
        let handler = handler(ScriptedProvider::with_replies(["noon"]), media);
        let chat = MockChat::direct("tg-1");
        let msg = voice_message(&chat, &user("tg-9", "eve"));
        let audio = msg.voice.as_ref().unwrap().path().to_path_buf();

        handler.handle(incoming(msg), true).await;

        let replies = chat.replies().await;
        assert_eq!(replies.len(), 2);
        assert!(matches!(
            &replies[0],
            Reply::Quote { text, quote, .. } if text == "noon" && quote == "Transcription:\nwhat time is it"
        ));
        assert!(matches!(&replies[1], Reply::Voice { existed: true, .. }));
        assert!(!audio.exists(), "voice input must be released");
        assert!(!synthesizer.produced().await[0].exists());
    }

    #[tokio::test]
    async fn failed_transcription_drops_message() {
        let provider = ScriptedProvider::new();
        let media = MediaServices {
            transcriber: Some(MockTranscriber::failing("garbled")),
            ..MediaServices::default()
        };
        let handler = handler(provider.clone(), media);
        let chat = MockChat::direct("tg-1");

        handler
            .handle(incoming(voice_message(&chat, &user("tg-9", "eve"))), true)
            .await;

        assert!(chat.replies().await.is_empty());
        assert_eq!(provider.call_count().await, 0);
    }

    #[tokio::test]
    async fn failed_synthesis_still_sends_text() {
        let media = MediaServices {
            transcriber: Some(MockTranscriber::returning("hi")),
            synthesizer: Some(MockSynthesizer::failing()),
            images: None,
        };
        let handler = handler(ScriptedProvider::with_replies(["hey"]), media);
        let chat = MockChat::direct("tg-1");

        handler
            .handle(incoming(voice_message(&chat, &user("tg-9", "eve"))), true)
            .await;

        assert_eq!(chat.texts().await, vec!["hey"]);
    }

    #[tokio::test(start_paused = true)]
    async fn provider_outage_yields_apology() {
        let provider = ScriptedProvider::with_steps([Step::Hang, Step::Hang, Step::Hang]);
        let handler = handler(provider, MediaServices::default());
        let chat = MockChat::direct("tg-1");

        handler
            .handle(incoming(text_message(&chat, &user("tg-9", "eve"), "hello")), true)
            .await;

        assert_eq!(chat.texts().await, vec![APOLOGY]);
    }

    #[tokio::test(start_paused = true)]
    async fn group_members_asking_together_take_turns_on_the_chat() {
        let provider = ScriptedProvider::with_steps([
            Step::Delayed(Duration::from_secs(10), "Paris.".into()),
            Step::Reply("About two million.".into()),
        ]);
        let handler = Arc::new(handler(provider.clone(), MediaServices::default()));
        let chat = MockChat::group("tg-100");

        let ask = |from: UserProfile, text: &str| {
            let handler = Arc::clone(&handler);
            let msg = incoming(text_message(&chat, &from, text));
            tokio::spawn(async move { handler.handle(msg, true).await })
        };

        let ann = ask(user("tg-1", "ann"), "@chloe_bot capital of France?");
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(provider.call_count().await, 1);

        let bob = ask(user("tg-2", "bob"), "Chloe, and its population?");
        tokio::time::sleep(Duration::from_secs(1)).await;
        // Bob waits for the chat while Ann's completion is in flight.
        assert_eq!(provider.call_count().await, 1);

        ann.await.unwrap();
        bob.await.unwrap();

        assert_eq!(chat.texts().await, vec!["Paris.", "About two million."]);
        let requests = provider.requests().await;
        assert_eq!(requests.len(), 2);
        let history: Vec<_> = requests[1]
            .messages
            .iter()
            .map(|m| (m.role, m.content.as_str()))
            .collect();
        assert_eq!(
            history[1..],
            [
                (Role::User, "@chloe_bot capital of France?"),
                (Role::Assistant, "Paris."),
                (Role::User, "Chloe, and its population?"),
            ]
        );
    }

    #[test]
    fn malformed_messages_are_rejected() {
        let chat = MockChat::direct("tg-1");
        let mut msg = text_message(&chat, &user("tg-9", "eve"), "hi");
        msg.sender = None;
        assert_eq!(Incoming::from_message(msg).err(), Some("missing sender"));

        let msg = text_message(&chat, &user("", "eve"), "hi");
        assert_eq!(Incoming::from_message(msg).err(), Some("empty user id"));

        let blank_chat = MockChat::direct(" ");
        let msg = text_message(&blank_chat, &user("tg-9", "eve"), "hi");
        assert_eq!(Incoming::from_message(msg).err(), Some("empty chat id"));
    }
}
