use async_trait::async_trait;

use crate::{wire::Ack, CallContext, Params, Result, WormlyClient};

/// Account-wide alert muting.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait GlobalAlertMuteApi: Send + Sync {
    /// Mutes (`true`) or unmutes all alerts for the account.
    async fn set_global_alert_mute(&self, ctx: &CallContext, muted: bool) -> Result<()>;
}

#[async_trait]
impl GlobalAlertMuteApi for WormlyClient {
    async fn set_global_alert_mute(&self, ctx: &CallContext, muted: bool) -> Result<()> {
        let mut params = Params::new();
        params.insert_flag("alertsmuted", muted);
        self.envelope::<Ack>(ctx, "setGlobalAlertMute", &params, "failed to set global alert mute")
            .await?;
        Ok(())
    }
}
