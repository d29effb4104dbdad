//! Relays messages in the designated channel to the model.

use std::time::Instant;

use log::{debug, error, info, warn};
use poise::serenity_prelude::ChannelId;

use crate::error::Result;
use crate::ollama::ResponseGenerator;
use crate::weather::{Units, WeatherClient, weather_location};

use super::channel::{InboundMessage, RelayChannel};
use super::chunker::{MAX_MESSAGE_LEN, split_message};
use super::context::{CONTEXT_LIMIT, fetch_context};
use super::cooldown::{CooldownTracker, cooldown_notice};

/// Messages starting with this are left to the slash command system.
const COMMAND_PREFIX: char = '/';

/// Shared relay state: where to listen, who answers, and who is cooling down.
pub struct Relay<G> {
    channel_id: ChannelId,
    generator: G,
    cooldowns: CooldownTracker,
    weather: Option<WeatherClient>,
}

impl<G: ResponseGenerator> Relay<G> {
    #[must_use]
    pub fn new(channel_id: ChannelId, generator: G, weather: Option<WeatherClient>) -> Self {
        Self {
            channel_id,
            generator,
            cooldowns: CooldownTracker::default(),
            weather,
        }
    }

    #[must_use]
    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    #[must_use]
    pub fn cooldowns(&self) -> &CooldownTracker {
        &self.cooldowns
    }

    /// Handle one inbound message.
    ///
    /// Errors from answering are reported to the user and swallowed.
    ///
    /// # Errors
    ///
    /// Returns an error only if a reply (answer, apology, or cooldown notice)
    /// cannot be delivered to the channel.
    pub async fn handle_message<C: RelayChannel>(
        &self,
        channel: &C,
        message: &InboundMessage,
    ) -> Result<()> {
        if message.author_is_bot || message.channel_id != self.channel_id {
            return Ok(());
        }

        let now = Instant::now();
        if let Some(remaining) = self.cooldowns.remaining(message.author_id, now) {
            debug!(
                "{} is on cooldown for another {}ms",
                message.author_name,
                remaining.as_millis()
            );
            channel.reply(&cooldown_notice(remaining)).await?;
            return Ok(());
        }

        let prompt = message.content.trim();
        if prompt.is_empty() || prompt.starts_with(COMMAND_PREFIX) {
            return Ok(());
        }

        info!(
            "Relaying message from {} in channel {}: {}",
            message.author_name, message.channel_id, prompt
        );

        if let Err(e) = channel.broadcast_typing().await {
            debug!("Failed to broadcast typing indicator: {e}");
        }
        self.cooldowns.record(message.author_id, now);

        match self.answer(channel, message, prompt).await {
            Ok(text) => deliver(channel, &text).await?,
            Err(e) => {
                error!(
                    "Error answering message from {}: {}",
                    message.author_name, e
                );
                channel.reply(&e.user_message()).await?;
            }
        }

        Ok(())
    }

    async fn answer<C: RelayChannel>(
        &self,
        channel: &C,
        message: &InboundMessage,
        prompt: &str,
    ) -> Result<String> {
        let context = fetch_context(channel, message.id, CONTEXT_LIMIT).await;
        let live_weather = self.live_weather(prompt).await;

        self.generator
            .generate(
                prompt,
                &message.author_name,
                &context,
                live_weather.as_deref(),
            )
            .await
    }

    async fn live_weather(&self, prompt: &str) -> Option<String> {
        let client = self.weather.as_ref()?;
        let location = weather_location(prompt)?;

        match client.current(&location, Units::Metric).await {
            Ok(report) => {
                debug!("Adding live weather for {location} to prompt");
                Some(report.to_string())
            }
            Err(e) => {
                warn!("Weather lookup for {location} failed, continuing without it: {e}");
                None
            }
        }
    }
}

async fn deliver<C: RelayChannel>(channel: &C, text: &str) -> Result<()> {
    if text.chars().count() <= MAX_MESSAGE_LEN {
        return channel.reply(text).await;
    }

    let segments = split_message(text, MAX_MESSAGE_LEN);
    debug!("Response split into {} messages", segments.len());
    for segment in &segments {
        channel.reply(segment).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use poise::serenity_prelude::{MessageId, UserId};

    use super::*;
    use crate::error::BotError;
    use crate::relay::channel::HistoryMessage;
    use crate::test_support::serve_once;
    use crate::types::ContextLine;

    const RELAY_CHANNEL: u64 = 42;
    const BOT_ID: u64 = 999;
    const ALICE_ID: u64 = 1;

    #[derive(Default)]
    struct FakeChannel {
        history: Vec<HistoryMessage>,
        history_fails: bool,
        typing: AtomicUsize,
        replies: Mutex<Vec<String>>,
    }

    impl FakeChannel {
        fn replies(&self) -> Vec<String> {
            self.replies.lock().expect("lock").clone()
        }

        fn typing_count(&self) -> usize {
            self.typing.load(Ordering::SeqCst)
        }
    }

    impl RelayChannel for FakeChannel {
        fn bot_user_id(&self) -> UserId {
            UserId::new(BOT_ID)
        }

        async fn recent_messages(
            &self,
            _before: MessageId,
            limit: u8,
        ) -> Result<Vec<HistoryMessage>> {
            if self.history_fails {
                return Err(BotError::Config("no history".to_string()));
            }
            Ok(self
                .history
                .iter()
                .rev()
                .take(usize::from(limit))
                .cloned()
                .collect())
        }

        async fn broadcast_typing(&self) -> Result<()> {
            self.typing.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn reply(&self, content: &str) -> Result<()> {
            self.replies
                .lock()
                .expect("lock")
                .push(content.to_string());
            Ok(())
        }
    }

    enum Outcome {
        Text(String),
        Timeout,
        Invalid,
    }

    struct Call {
        prompt: String,
        username: String,
        context: Vec<String>,
        live_data: Option<String>,
    }

    struct FakeGenerator {
        outcome: Outcome,
        calls: Mutex<Vec<Call>>,
    }

    impl FakeGenerator {
        fn new(outcome: Outcome) -> Self {
            Self {
                outcome,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl ResponseGenerator for FakeGenerator {
        async fn generate(
            &self,
            prompt: &str,
            username: &str,
            context: &[ContextLine],
            live_data: Option<&str>,
        ) -> Result<String> {
            self.calls.lock().expect("lock").push(Call {
                prompt: prompt.to_string(),
                username: username.to_string(),
                context: context.iter().map(ToString::to_string).collect(),
                live_data: live_data.map(str::to_string),
            });
            match &self.outcome {
                Outcome::Text(text) => Ok(text.clone()),
                Outcome::Timeout => Err(BotError::InferenceTimeout(Duration::from_secs(60))),
                Outcome::Invalid => Err(BotError::InferenceResponse("garbage".to_string())),
            }
        }
    }

    fn relay(outcome: Outcome) -> Relay<FakeGenerator> {
        Relay::new(
            ChannelId::new(RELAY_CHANNEL),
            FakeGenerator::new(outcome),
            None,
        )
    }

    async fn relay_with_weather(
        outcome: Outcome,
        status: &'static str,
        body: &'static str,
    ) -> Relay<FakeGenerator> {
        let (base_url, _server) = serve_once(status, body).await;
        Relay::new(
            ChannelId::new(RELAY_CHANNEL),
            FakeGenerator::new(outcome),
            Some(WeatherClient::with_endpoint(base_url)),
        )
    }

    fn calls(relay: &Relay<FakeGenerator>) -> usize {
        relay.generator.calls.lock().expect("lock").len()
    }

    fn message(id: u64, content: &str) -> InboundMessage {
        InboundMessage {
            id: MessageId::new(id),
            channel_id: ChannelId::new(RELAY_CHANNEL),
            author_id: UserId::new(ALICE_ID),
            author_name: "alice".to_string(),
            author_is_bot: false,
            content: content.to_string(),
        }
    }

    fn history(author_id: u64, name: &str, bot: bool, content: &str) -> HistoryMessage {
        HistoryMessage {
            author_id: UserId::new(author_id),
            author_name: name.to_string(),
            author_is_bot: bot,
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn answers_with_context_and_records_cooldown() {
        let relay = relay(Outcome::Text("Not much!".to_string()));
        let channel = FakeChannel {
            history: vec![
                history(ALICE_ID, "alice", false, "hi"),
                history(BOT_ID, "ollamacord", true, "hello"),
                history(555, "otherbot", true, "beep"),
            ],
            ..FakeChannel::default()
        };

        relay
            .handle_message(&channel, &message(10, "  what's up  "))
            .await
            .expect("handled");

        assert_eq!(channel.replies(), ["Not much!"]);
        assert_eq!(channel.typing_count(), 1);
        assert_eq!(relay.cooldowns().len(), 1);

        let calls = relay.generator.calls.lock().expect("lock");
        assert_eq!(calls[0].prompt, "what's up");
        assert_eq!(calls[0].username, "alice");
        assert_eq!(calls[0].context, ["alice: hi", "Assistant: hello"]);
    }

    #[tokio::test]
    async fn ignores_bots_and_other_channels() {
        let relay = relay(Outcome::Text("nope".to_string()));
        let channel = FakeChannel::default();

        let mut from_bot = message(10, "hello");
        from_bot.author_is_bot = true;
        relay
            .handle_message(&channel, &from_bot)
            .await
            .expect("handled");

        let mut elsewhere = message(11, "hello");
        elsewhere.channel_id = ChannelId::new(7);
        relay
            .handle_message(&channel, &elsewhere)
            .await
            .expect("handled");

        assert!(channel.replies().is_empty());
        assert_eq!(channel.typing_count(), 0);
        assert_eq!(calls(&relay), 0);
        assert!(relay.cooldowns().is_empty());
    }

    #[tokio::test]
    async fn second_request_within_window_gets_cooldown_notice() {
        let relay = relay(Outcome::Text("first answer".to_string()));
        let channel = FakeChannel::default();

        relay
            .handle_message(&channel, &message(10, "first"))
            .await
            .expect("handled");
        relay
            .handle_message(&channel, &message(11, "second"))
            .await
            .expect("handled");

        assert_eq!(
            channel.replies(),
            [
                "first answer",
                "Please wait 30 more seconds before asking another question."
            ]
        );
        assert_eq!(calls(&relay), 1);
        assert_eq!(channel.typing_count(), 1);
    }

    #[tokio::test]
    async fn commands_and_blank_messages_are_ignored() {
        let relay = relay(Outcome::Text("nope".to_string()));
        let channel = FakeChannel::default();

        for content in ["/help", "   ", "\n\t", ""] {
            relay
                .handle_message(&channel, &message(10, content))
                .await
                .expect("handled");
        }

        assert!(channel.replies().is_empty());
        assert_eq!(channel.typing_count(), 0);
        assert!(relay.cooldowns().is_empty());
        assert_eq!(calls(&relay), 0);
    }

    #[tokio::test]
    async fn long_answers_are_chunked() {
        let long = (0..100)
            .map(|i| format!("Paragraph {i}: {}", "lorem ipsum ".repeat(5)))
            .collect::<Vec<_>>()
            .join("\n");
        assert!(long.chars().count() > MAX_MESSAGE_LEN * 2);
        let relay = relay(Outcome::Text(long.clone()));
        let channel = FakeChannel::default();

        relay
            .handle_message(&channel, &message(10, "tell me a story"))
            .await
            .expect("handled");

        let replies = channel.replies();
        assert!(replies.len() >= 3);
        assert!(replies.iter().all(|r| r.chars().count() <= MAX_MESSAGE_LEN));
        let rejoined: Vec<&str> = replies
            .iter()
            .flat_map(|r| r.lines())
            .map(str::trim)
            .collect();
        let expected: Vec<&str> = long.lines().map(str::trim).collect();
        assert_eq!(rejoined, expected);
    }

    #[tokio::test]
    async fn timeout_is_reported_to_user() {
        let relay = relay(Outcome::Timeout);
        let channel = FakeChannel::default();

        relay
            .handle_message(&channel, &message(10, "explain the universe"))
            .await
            .expect("handled");

        assert_eq!(
            channel.replies(),
            [BotError::InferenceTimeout(Duration::from_secs(60)).user_message()]
        );
        assert_eq!(relay.cooldowns().len(), 1);
    }

    #[tokio::test]
    async fn invalid_response_gets_generic_apology() {
        let relay = relay(Outcome::Invalid);
        let channel = FakeChannel::default();

        relay
            .handle_message(&channel, &message(10, "hi"))
            .await
            .expect("handled");

        assert_eq!(
            channel.replies(),
            [BotError::InferenceResponse(String::new()).user_message()]
        );
    }

    #[tokio::test]
    async fn history_failure_still_answers_without_context() {
        let relay = relay(Outcome::Text("still here".to_string()));
        let channel = FakeChannel {
            history_fails: true,
            ..FakeChannel::default()
        };

        relay
            .handle_message(&channel, &message(10, "hello?"))
            .await
            .expect("handled");

        assert_eq!(channel.replies(), ["still here"]);
        assert!(
            relay.generator.calls.lock().expect("lock")[0]
                .context
                .is_empty()
        );
    }

    #[tokio::test]
    async fn weather_prompt_adds_live_data() {
        let relay = relay_with_weather(
            Outcome::Text("Sunny enough.".to_string()),
            "200 OK",
            r#"{"weather": [{"description": "clear sky"}],
                "main": {"temp": 18.46, "feels_like": 17.9, "humidity": 62},
                "wind": {"speed": 3.6}, "sys": {"country": "FR"}, "name": "Paris"}"#,
        )
        .await;
        let channel = FakeChannel::default();

        relay
            .handle_message(&channel, &message(10, "what's the weather in Paris?"))
            .await
            .expect("handled");

        assert_eq!(channel.replies(), ["Sunny enough."]);
        let calls = relay.generator.calls.lock().expect("lock");
        let live = calls[0].live_data.as_deref().expect("live weather");
        assert!(live.starts_with("Paris, FR: clear sky"));
    }

    #[tokio::test]
    async fn failed_weather_lookup_still_answers() {
        let relay = relay_with_weather(
            Outcome::Text("I can't check, but probably mild.".to_string()),
            "500 Internal Server Error",
            r#"{"message":"upstream down"}"#,
        )
        .await;
        let channel = FakeChannel::default();

        relay
            .handle_message(&channel, &message(10, "what's the weather in Paris?"))
            .await
            .expect("handled");

        assert_eq!(channel.replies(), ["I can't check, but probably mild."]);
        let calls = relay.generator.calls.lock().expect("lock");
        assert_eq!(calls.len(), 1);
        assert!(calls[0].live_data.is_none());
    }

    #[tokio::test]
    async fn prompt_without_location_skips_weather_lookup() {
        let relay = relay_with_weather(
            Outcome::Text("Hello!".to_string()),
            "500 Internal Server Error",
            "{}",
        )
        .await;
        let channel = FakeChannel::default();

        relay
            .handle_message(&channel, &message(10, "hi there"))
            .await
            .expect("handled");

        assert_eq!(channel.replies(), ["Hello!"]);
        assert!(relay.generator.calls.lock().expect("lock")[0].live_data.is_none());
    }
}
