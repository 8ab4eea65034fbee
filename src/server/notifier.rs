use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::{
    common::types::{AnyResult, ChannelId, GuildId, MessageId},
    protocol::events::RoomEvent,
};

/// The presentation side of a room: where events, posts and replies end up.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Fire-and-forget room event.
    fn emit(&self, guild: &GuildId, event: RoomEvent);

    /// Post `event` as a new message in `channel`, returning its id when known.
    async fn post(&self, channel: ChannelId, event: &RoomEvent) -> AnyResult<Option<MessageId>>;

    /// Reply to `message` in `channel` with `event`.
    async fn reply(
        &self,
        channel: ChannelId,
        message: MessageId,
        event: &RoomEvent,
    ) -> AnyResult<()>;
}

/// What a `ChannelNotifier` hands to the embedding application.
#[derive(Debug)]
pub enum Outbound {
    Event {
        guild: GuildId,
        event: RoomEvent,
    },
    Post {
        channel: ChannelId,
        event: RoomEvent,
        respond: oneshot::Sender<Option<MessageId>>,
    },
    Reply {
        channel: ChannelId,
        message: MessageId,
        event: RoomEvent,
        respond: oneshot::Sender<bool>,
    },
}

/// Forwards everything over a flume channel. The receiver answers posts and replies
/// through the enclosed responders.
#[derive(Clone)]
pub struct ChannelNotifier {
    sender: flume::Sender<Outbound>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, flume::Receiver<Outbound>) {
        let (sender, receiver) = flume::unbounded();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    fn emit(&self, guild: &GuildId, event: RoomEvent) {
        tracing::trace!("[{}] {}", guild, event.name());
        let _ = self.sender.send(Outbound::Event {
            guild: guild.clone(),
            event,
        });
    }

    async fn post(&self, channel: ChannelId, event: &RoomEvent) -> AnyResult<Option<MessageId>> {
        let (respond, response) = oneshot::channel();
        self.sender
            .send_async(Outbound::Post {
                channel,
                event: event.clone(),
                respond,
            })
            .await
            .map_err(|_| "notifier receiver is gone")?;

        Ok(response.await.unwrap_or(None))
    }

    async fn reply(
        &self,
        channel: ChannelId,
        message: MessageId,
        event: &RoomEvent,
    ) -> AnyResult<()> {
        let (respond, response) = oneshot::channel();
        self.sender
            .send_async(Outbound::Reply {
                channel,
                message,
                event: event.clone(),
                respond,
            })
            .await
            .map_err(|_| "notifier receiver is gone")?;

        match response.await {
            Ok(true) => Ok(()),
            _ => Err(format!("reply to message {} was not delivered", message).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_post_returns_embedder_id() {
        let (notifier, receiver) = ChannelNotifier::new();

        let embedder = tokio::spawn(async move {
            while let Ok(outbound) = receiver.recv_async().await {
                match outbound {
                    Outbound::Post { respond, .. } => {
                        let _ = respond.send(Some(MessageId(99)));
                    }
                    Outbound::Reply { respond, .. } => {
                        let _ = respond.send(false);
                    }
                    Outbound::Event { .. } => {}
                }
            }
        });

        notifier.emit(&GuildId::from(1u64), RoomEvent::QueueEnded);
        let id = notifier.post(ChannelId(5), &RoomEvent::QueueEnded).await.unwrap();
        assert_eq!(id, Some(MessageId(99)));

        assert!(
            notifier
                .reply(ChannelId(5), MessageId(99), &RoomEvent::QueueEnded)
                .await
                .is_err()
        );

        drop(notifier);
        embedder.await.unwrap();
    }

    #[tokio::test]
    async fn test_post_without_receiver_fails() {
        let (notifier, receiver) = ChannelNotifier::new();
        drop(receiver);
        assert!(notifier.post(ChannelId(5), &RoomEvent::QueueEnded).await.is_err());
    }
}
