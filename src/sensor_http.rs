use async_trait::async_trait;

use crate::{
    decode::{int_from_value, text_from_value, HttpSensorParams},
    wire::{Ack, RawSensor, SensorCreated, SensorList},
    CallContext, NewSensorHttp, Params, Result, SensorHttp, SensorType, WormlyClient,
    WormlyError,
};

/// HTTP sensor operations. Sensor ids are host-sensor ids (`hsid`).
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait SensorHttpApi: Send + Sync {
    async fn create_sensor_http(&self, ctx: &CallContext, sensor: &NewSensorHttp)
        -> Result<SensorHttp>;

    async fn get_sensor_http(&self, ctx: &CallContext, host_id: i64, hsid: i64)
        -> Result<SensorHttp>;

    /// HTTP sensors of a host; sensors of other types are left out.
    async fn list_sensor_http(&self, ctx: &CallContext, host_id: i64) -> Result<Vec<SensorHttp>>;

    async fn delete_sensor_http(&self, ctx: &CallContext, hsid: i64) -> Result<()>;

    async fn enable_sensor_http(&self, ctx: &CallContext, hsid: i64) -> Result<()>;

    async fn disable_sensor_http(&self, ctx: &CallContext, hsid: i64) -> Result<()>;

    async fn find_sensor_http(
        &self,
        ctx: &CallContext,
        host_id: i64,
        hsid: i64,
    ) -> Result<Option<SensorHttp>> {
        match self.get_sensor_http(ctx, host_id, hsid).await {
            Ok(sensor) => Ok(Some(sensor)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

fn create_params(sensor: &NewSensorHttp) -> Params {
    let mut params = Params::new()
        .with("hostid", sensor.host_id)
        .with("url", &sensor.url);
    params
        .insert_non_empty("nicename", &sensor.nice_name)
        .insert_positive("timeout", sensor.timeout)
        .insert_non_empty("responsecode", &sensor.response_code)
        .insert_flag("verifysslcert", sensor.verify_ssl_cert)
        .insert_flag("searchheaders", sensor.search_headers)
        .insert_non_empty("expectedtext", &sensor.expected_text)
        .insert_non_empty("unwantedtext", &sensor.unwanted_text)
        .insert_positive("sslvalidity", sensor.ssl_validity)
        .insert_non_empty("cookies", &sensor.cookies)
        .insert_non_empty("postparams", &sensor.post_params)
        .insert_non_empty("customrequestheaders", &sensor.custom_request_headers)
        .insert_non_empty("useragent", &sensor.user_agent)
        .insert_non_empty("forceresolve", &sensor.force_resolve);
    params
}

fn sensor_from_row(row: &RawSensor, host_id: i64) -> Result<SensorHttp> {
    let id = int_from_value(&row.hsid).ok_or_else(|| {
        WormlyError::Decode(format!("invalid HSID value: {}", row.hsid))
    })?;
    let params = HttpSensorParams::from_wire(&row.params);

    Ok(SensorHttp {
        id,
        host_id,
        url: params.url,
        nice_name: row.nicename.clone(),
        enabled: row.enabled,
        timeout: params.timeout,
        response_code: params.response_code,
        verify_ssl_cert: params.verify_ssl_cert,
        search_headers: params.search_headers,
        expected_text: params.expected_text,
        unwanted_text: params.unwanted_text,
        ssl_validity: params.ssl_validity,
        cookies: params.cookies,
        post_params: params.post_params,
        custom_request_headers: params.custom_request_headers,
        user_agent: params.user_agent,
        force_resolve: params.force_resolve,
    })
}

fn sensor_type(row: &RawSensor) -> SensorType {
    text_from_value(&row.sensorid)
        .map(|id| SensorType::from_id(&id))
        .unwrap_or(SensorType::Unknown)
}

#[async_trait]
impl SensorHttpApi for WormlyClient {
    async fn create_sensor_http(
        &self,
        ctx: &CallContext,
        sensor: &NewSensorHttp,
    ) -> Result<SensorHttp> {
        let params = create_params(sensor);
        let created: SensorCreated = self
            .envelope(ctx, "addHostSensor_HTTP", &params, "failed to create HTTP sensor")
            .await?;

        Ok(SensorHttp {
            id: created.hostsensorid,
            host_id: sensor.host_id,
            url: sensor.url.clone(),
            nice_name: sensor.nice_name.clone(),
            enabled: true,
            timeout: sensor.timeout,
            response_code: sensor.response_code.clone(),
            verify_ssl_cert: sensor.verify_ssl_cert,
            search_headers: sensor.search_headers,
            expected_text: sensor.expected_text.clone(),
            unwanted_text: sensor.unwanted_text.clone(),
            ssl_validity: sensor.ssl_validity,
            cookies: sensor.cookies.clone(),
            post_params: sensor.post_params.clone(),
            custom_request_headers: sensor.custom_request_headers.clone(),
            user_agent: sensor.user_agent.clone(),
            force_resolve: sensor.force_resolve.clone(),
        })
    }

    async fn get_sensor_http(
        &self,
        ctx: &CallContext,
        host_id: i64,
        hsid: i64,
    ) -> Result<SensorHttp> {
        let params = Params::new().with("hostid", host_id);
        let list: SensorList = self
            .envelope(ctx, "getHostSensors", &params, "failed to get HTTP sensor")
            .await?;

        // Rows with an unusable hsid cannot match and are skipped.
        list.sensors
            .iter()
            .find(|row| int_from_value(&row.hsid) == Some(hsid))
            .map(|row| sensor_from_row(row, host_id))
            .unwrap_or_else(|| {
                Err(WormlyError::NotFound {
                    entity: "HTTP sensor",
                    id: format!("{hsid} for host {host_id}"),
                })
            })
    }

    async fn list_sensor_http(&self, ctx: &CallContext, host_id: i64) -> Result<Vec<SensorHttp>> {
        let params = Params::new().with("hostid", host_id);
        let list: SensorList = self
            .envelope(ctx, "getHostSensors", &params, "failed to list HTTP sensors")
            .await?;

        list.sensors
            .iter()
            .filter(|row| sensor_type(row) == SensorType::Http)
            .map(|row| {
                sensor_from_row(row, host_id).map_err(|err| {
                    err.context(format!("failed to convert sensor (HSID: {})", row.hsid))
                })
            })
            .collect()
    }

    async fn delete_sensor_http(&self, ctx: &CallContext, hsid: i64) -> Result<()> {
        let params = Params::new().with("hsid", hsid);
        self.envelope::<Ack>(ctx, "deleteSensor", &params, "failed to delete HTTP sensor")
            .await?;
        Ok(())
    }

    async fn enable_sensor_http(&self, ctx: &CallContext, hsid: i64) -> Result<()> {
        let params = Params::new().with("hsid", hsid);
        self.envelope::<Ack>(ctx, "enableSensor", &params, "failed to enable HTTP sensor")
            .await?;
        Ok(())
    }

    async fn disable_sensor_http(&self, ctx: &CallContext, hsid: i64) -> Result<()> {
        let params = Params::new().with("hsid", hsid);
        self.envelope::<Ack>(ctx, "disableSensor", &params, "failed to disable HTTP sensor")
            .await?;
        Ok(())
    }
}
