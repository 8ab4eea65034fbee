use std::time::Duration;

use tracing::{debug, info, warn};

use super::{backoff::Backoff, driver::VoiceDriver};
use crate::{
    common::{
        errors::TransportError,
        types::{ChannelId, GuildId},
    },
    configs::VoiceConfig,
};

/// Make sure the room's transport sits in `channel`.
///
/// Reuses an existing connection to the same channel and moves an existing connection
/// elsewhere. A failed move falls back to disconnect, settle, reconnect.
pub async fn ensure_connected(
    driver: &dyn VoiceDriver,
    guild: &GuildId,
    channel: ChannelId,
    config: &VoiceConfig,
) -> Result<(), TransportError> {
    match driver.current_channel(guild) {
        Some(current) if current == channel => Ok(()),
        Some(current) => {
            debug!("[{}] Moving voice connection {} -> {}", guild, current, channel);
            match driver.move_to(guild, channel).await {
                Ok(()) => Ok(()),
                Err(e) => {
                    warn!("[{}] Move failed ({}); reconnecting", guild, e);
                    driver.disconnect(guild).await;
                    tokio::time::sleep(Duration::from_millis(config.reconnect_settle_ms)).await;
                    connect_with_retry(driver, guild, channel, config).await
                }
            }
        }
        None => connect_with_retry(driver, guild, channel, config).await,
    }
}

async fn connect_with_retry(
    driver: &dyn VoiceDriver,
    guild: &GuildId,
    channel: ChannelId,
    config: &VoiceConfig,
) -> Result<(), TransportError> {
    let mut backoff = Backoff::new(config.backoff_base_ms, config.connect_attempts);

    loop {
        match driver.connect(guild, channel).await {
            Ok(()) => {
                info!("[{}] Connected to voice channel {}", guild, channel);
                return Ok(());
            }
            Err(e) => {
                let delay = backoff.next();
                if backoff.is_exhausted() {
                    warn!(
                        "[{}] Voice connect failed after {} attempts: {}",
                        guild,
                        backoff.attempt(),
                        e
                    );
                    return Err(e);
                }
                warn!("[{}] Voice connect failed: {}. Retrying in {:?}", guild, e, delay);
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeDriver;

    fn config() -> VoiceConfig {
        VoiceConfig {
            connect_attempts: 3,
            backoff_base_ms: 100,
            reconnect_settle_ms: 50,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_retries_until_success() {
        let driver = FakeDriver::default();
        driver.fail_next_connects(2);
        let guild = GuildId::from(1u64);

        ensure_connected(&driver, &guild, ChannelId(7), &config())
            .await
            .unwrap();

        assert_eq!(driver.current_channel(&guild), Some(ChannelId(7)));
        assert_eq!(driver.connect_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_gives_up_after_attempts() {
        let driver = FakeDriver::default();
        driver.fail_next_connects(5);
        let guild = GuildId::from(1u64);

        let err = ensure_connected(&driver, &guild, ChannelId(7), &config())
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Connect(_)));
        assert_eq!(driver.connect_calls(), 3);
        assert_eq!(driver.current_channel(&guild), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_channel_is_reused_and_failed_move_reconnects() {
        let driver = FakeDriver::default();
        let guild = GuildId::from(1u64);

        ensure_connected(&driver, &guild, ChannelId(7), &config()).await.unwrap();
        ensure_connected(&driver, &guild, ChannelId(7), &config()).await.unwrap();
        assert_eq!(driver.connect_calls(), 1);

        driver.fail_moves(true);
        ensure_connected(&driver, &guild, ChannelId(9), &config()).await.unwrap();
        assert_eq!(driver.current_channel(&guild), Some(ChannelId(9)));
        assert_eq!(driver.connect_calls(), 2);
    }
}
