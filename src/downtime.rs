use async_trait::async_trait;

use crate::{
    wire::{Ack, PeriodList, PeriodSaved},
    CallContext, DowntimeSchedule, Params, Result, ScheduledDowntimePeriod, WormlyClient,
    WormlyError,
};

/// Scheduled downtime windows of a host.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait ScheduledDowntimeApi: Send + Sync {
    async fn create_scheduled_downtime_period(
        &self,
        ctx: &CallContext,
        host_id: i64,
        schedule: &DowntimeSchedule,
    ) -> Result<ScheduledDowntimePeriod>;

    async fn update_scheduled_downtime_period(
        &self,
        ctx: &CallContext,
        host_id: i64,
        period_id: i64,
        schedule: &DowntimeSchedule,
    ) -> Result<ScheduledDowntimePeriod>;

    async fn get_scheduled_downtime_periods(
        &self,
        ctx: &CallContext,
        host_id: i64,
    ) -> Result<Vec<ScheduledDowntimePeriod>>;

    async fn get_scheduled_downtime_period(
        &self,
        ctx: &CallContext,
        host_id: i64,
        period_id: i64,
    ) -> Result<ScheduledDowntimePeriod> {
        self.get_scheduled_downtime_periods(ctx, host_id)
            .await?
            .into_iter()
            .find(|period| period.id == period_id)
            .ok_or_else(|| WormlyError::NotFound {
                entity: "scheduled downtime period",
                id: period_id.to_string(),
            })
    }

    async fn delete_scheduled_downtime_period(
        &self,
        ctx: &CallContext,
        host_id: i64,
        period_id: i64,
    ) -> Result<()>;

    async fn find_scheduled_downtime_period(
        &self,
        ctx: &CallContext,
        host_id: i64,
        period_id: i64,
    ) -> Result<Option<ScheduledDowntimePeriod>> {
        match self
            .get_scheduled_downtime_period(ctx, host_id, period_id)
            .await
        {
            Ok(period) => Ok(Some(period)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

fn schedule_params(host_id: i64, schedule: &DowntimeSchedule) -> Params {
    let mut params = Params::new()
        .with("hostid", host_id)
        .with("start", &schedule.start)
        .with("end", &schedule.end)
        .with("timezone", &schedule.timezone)
        .with("recurrence", &schedule.recurrence);
    params.insert_non_empty("on", &schedule.on);
    params
}

fn period(id: i64, host_id: i64, schedule: &DowntimeSchedule) -> ScheduledDowntimePeriod {
    ScheduledDowntimePeriod {
        id,
        host_id,
        start: schedule.start.clone(),
        end: schedule.end.clone(),
        timezone: schedule.timezone.clone(),
        recurrence: schedule.recurrence.clone(),
        on: schedule.on.clone(),
    }
}

#[async_trait]
impl ScheduledDowntimeApi for WormlyClient {
    async fn create_scheduled_downtime_period(
        &self,
        ctx: &CallContext,
        host_id: i64,
        schedule: &DowntimeSchedule,
    ) -> Result<ScheduledDowntimePeriod> {
        let params = schedule_params(host_id, schedule);
        let saved: PeriodSaved = self
            .envelope(
                ctx,
                "setScheduledDowntimePeriod",
                &params,
                "failed to create scheduled downtime period",
            )
            .await?;
        Ok(period(saved.periodid, host_id, schedule))
    }

    async fn update_scheduled_downtime_period(
        &self,
        ctx: &CallContext,
        host_id: i64,
        period_id: i64,
        schedule: &DowntimeSchedule,
    ) -> Result<ScheduledDowntimePeriod> {
        let params = schedule_params(host_id, schedule).with("periodid", period_id);
        let saved: PeriodSaved = self
            .envelope(
                ctx,
                "setScheduledDowntimePeriod",
                &params,
                "failed to update scheduled downtime period",
            )
            .await?;

        // Updates may answer without echoing the id.
        let id = if saved.periodid != 0 {
            saved.periodid
        } else {
            period_id
        };
        Ok(period(id, host_id, schedule))
    }

    async fn get_scheduled_downtime_periods(
        &self,
        ctx: &CallContext,
        host_id: i64,
    ) -> Result<Vec<ScheduledDowntimePeriod>> {
        let params = Params::new().with("hostid", host_id);
        let list: PeriodList = self
            .envelope(
                ctx,
                "getScheduledDowntimePeriods",
                &params,
                "failed to get scheduled downtime periods",
            )
            .await?;

        Ok(list
            .periods
            .into_iter()
            .map(|raw| ScheduledDowntimePeriod {
                id: raw.periodid,
                host_id,
                start: raw.start,
                end: raw.end,
                timezone: raw.timezone,
                recurrence: raw.recurrence,
                on: raw.on,
            })
            .collect())
    }

    async fn delete_scheduled_downtime_period(
        &self,
        ctx: &CallContext,
        host_id: i64,
        period_id: i64,
    ) -> Result<()> {
        let params = Params::new()
            .with("hostid", host_id)
            .with("periodid", period_id);
        self.envelope::<Ack>(
            ctx,
            "deleteScheduledDowntimePeriod",
            &params,
            "failed to delete scheduled downtime period",
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{schedule_params, MockScheduledDowntimeApi, ScheduledDowntimeApi};
    use crate::{CallContext, DowntimeSchedule, ScheduledDowntimePeriod};

    #[tokio::test]
    async fn mock_downtime_api_substitutes_for_client() {
        let mut api = MockScheduledDowntimeApi::new();
        api.expect_create_scheduled_downtime_period()
            .withf(|_, host_id, schedule| *host_id == 3 && schedule.recurrence == "DAILY")
            .times(1)
            .returning(|_, host_id, schedule| {
                Ok(ScheduledDowntimePeriod {
                    id: 12,
                    host_id,
                    start: schedule.start.clone(),
                    end: schedule.end.clone(),
                    timezone: schedule.timezone.clone(),
                    recurrence: schedule.recurrence.clone(),
                    on: schedule.on.clone(),
                })
            });
        api.expect_delete_scheduled_downtime_period()
            .withf(|_, host_id, period_id| *host_id == 3 && *period_id == 12)
            .times(1)
            .returning(|_, _, _| Ok(()));

        let api: &dyn ScheduledDowntimeApi = &api;
        let ctx = CallContext::new();
        let schedule = DowntimeSchedule {
            start: "01:00".to_owned(),
            end: "02:00".to_owned(),
            timezone: "UTC".to_owned(),
            recurrence: "DAILY".to_owned(),
            on: String::new(),
        };
        let period = api
            .create_scheduled_downtime_period(&ctx, 3, &schedule)
            .await
            .expect("create must succeed");
        assert_eq!(period.id, 12);
        api.delete_scheduled_downtime_period(&ctx, 3, period.id)
            .await
            .expect("delete must succeed");
    }

    #[test]
    fn daily_schedule_omits_on() {
        let schedule = DowntimeSchedule {
            start: "01:00".to_owned(),
            end: "02:00".to_owned(),
            timezone: "UTC".to_owned(),
            recurrence: "DAILY".to_owned(),
            on: String::new(),
        };
        let params = schedule_params(3, &schedule);
        assert_eq!(params.get("hostid"), Some("3"));
        assert_eq!(params.get("recurrence"), Some("DAILY"));
        assert_eq!(params.get("on"), None);
    }

    #[test]
    fn weekly_schedule_sends_on() {
        let schedule = DowntimeSchedule {
            recurrence: "WEEKLY".to_owned(),
            on: "mon".to_owned(),
            ..DowntimeSchedule::default()
        };
        assert_eq!(schedule_params(3, &schedule).get("on"), Some("mon"));
    }
}
