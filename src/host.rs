use async_trait::async_trait;

use crate::{
    wire::{Ack, HostCreated, HostStatusList},
    CallContext, Host, Params, Result, WormlyClient, WormlyError,
};

/// `getHostStatus` does not report the check interval, so reads assume the
/// API default.
pub const DEFAULT_TEST_INTERVAL: u32 = 60;

/// Host lifecycle operations.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait HostApi: Send + Sync {
    /// Registers a host. `enabled` is echoed back; the API has no such
    /// parameter on create, so callers toggle monitoring separately.
    async fn create_host(
        &self,
        ctx: &CallContext,
        name: &str,
        test_interval: u32,
        enabled: bool,
    ) -> Result<Host>;

    async fn get_host(&self, ctx: &CallContext, id: i64) -> Result<Host>;

    async fn delete_host(&self, ctx: &CallContext, id: i64) -> Result<()>;

    async fn enable_host_uptime_monitoring(&self, ctx: &CallContext, id: i64) -> Result<()>;

    async fn disable_host_uptime_monitoring(&self, ctx: &CallContext, id: i64) -> Result<()>;

    /// Like [`HostApi::get_host`] but maps a missing host to `None`.
    async fn find_host(&self, ctx: &CallContext, id: i64) -> Result<Option<Host>> {
        match self.get_host(ctx, id).await {
            Ok(host) => Ok(Some(host)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl HostApi for WormlyClient {
    async fn create_host(
        &self,
        ctx: &CallContext,
        name: &str,
        test_interval: u32,
        enabled: bool,
    ) -> Result<Host> {
        let params = Params::new()
            .with("name", name)
            .with("testinterval", test_interval);
        let created: HostCreated = self
            .envelope(ctx, "createHost", &params, "failed to create host")
            .await?;

        Ok(Host {
            id: created.hostid,
            name: name.to_owned(),
            test_interval,
            enabled,
        })
    }

    async fn get_host(&self, ctx: &CallContext, id: i64) -> Result<Host> {
        let params = Params::new().with("hostid", id);
        let list: HostStatusList = self
            .envelope(ctx, "getHostStatus", &params, "failed to get host")
            .await?;

        list.status
            .into_iter()
            .find(|status| status.hostid == id)
            .map(|status| Host {
                id: status.hostid,
                name: status.name,
                test_interval: DEFAULT_TEST_INTERVAL,
                enabled: status.uptimemonitored || status.healthmonitored,
            })
            .ok_or_else(|| WormlyError::NotFound {
                entity: "host",
                id: id.to_string(),
            })
    }

    async fn delete_host(&self, ctx: &CallContext, id: i64) -> Result<()> {
        let params = Params::new().with("hostid", id);
        self.envelope::<Ack>(ctx, "deleteHost", &params, "failed to delete host")
            .await?;
        Ok(())
    }

    async fn enable_host_uptime_monitoring(&self, ctx: &CallContext, id: i64) -> Result<()> {
        let params = Params::new().with("hostid", id);
        self.envelope::<Ack>(
            ctx,
            "enableHostUptimeMonitoring",
            &params,
            "failed to enable host uptime monitoring",
        )
        .await?;
        Ok(())
    }

    async fn disable_host_uptime_monitoring(&self, ctx: &CallContext, id: i64) -> Result<()> {
        let params = Params::new().with("hostid", id);
        self.envelope::<Ack>(
            ctx,
            "disableHostUptimeMonitoring",
            &params,
            "failed to disable host uptime monitoring",
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{HostApi, MockHostApi, DEFAULT_TEST_INTERVAL};
    use crate::{CallContext, Host, Result, WormlyError};

    async fn pause_monitoring(api: &dyn HostApi, ctx: &CallContext, id: i64) -> Result<bool> {
        let host = api.get_host(ctx, id).await?;
        if host.enabled {
            api.disable_host_uptime_monitoring(ctx, id).await?;
        }
        Ok(host.enabled)
    }

    #[tokio::test]
    async fn mock_host_api_substitutes_for_client() {
        let mut api = MockHostApi::new();
        api.expect_get_host()
            .withf(|_, id| *id == 5)
            .times(1)
            .returning(|_, id| {
                Ok(Host {
                    id,
                    name: "web".to_owned(),
                    test_interval: DEFAULT_TEST_INTERVAL,
                    enabled: true,
                })
            });
        api.expect_disable_host_uptime_monitoring()
            .withf(|_, id| *id == 5)
            .times(1)
            .returning(|_, _| Ok(()));

        let paused = pause_monitoring(&api, &CallContext::new(), 5)
            .await
            .expect("mock calls must succeed");
        assert!(paused);
    }

    #[tokio::test]
    async fn mock_host_api_propagates_errors() {
        let mut api = MockHostApi::new();
        api.expect_get_host().returning(|_, id| {
            Err(WormlyError::NotFound {
                entity: "host",
                id: id.to_string(),
            })
        });
        api.expect_disable_host_uptime_monitoring().never();

        let err = pause_monitoring(&api, &CallContext::new(), 9)
            .await
            .expect_err("missing host must fail");
        assert!(err.is_not_found());
    }
}
