//! Worker-side HTTP client and poll loop. Grounded in
//! `worker_node/table_node_client.py` (`TableNodeClient`) and
//! `worker_node/worker.py` (`Worker.start`/`_step`). The worker's internal
//! fan-out/process-pool runner is out of scope; this only reserves a
//! trial, hands it to a caller-supplied closure, and registers the result.

use crate::config::WorkerConfig;
use crate::trial::Trial;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableNodeClientError {
    #[error("table node returned a server error ({status})")]
    Server { status: u16 },
    #[error("table node rejected the request ({status}): {body}")]
    Client { status: u16, body: String },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Mirrors `TableNodeClient`: a thin `reqwest` wrapper that classifies
/// non-2xx responses the way the original distinguishes 5xx from 4xx.
pub struct TableNodeClient {
    http: reqwest::Client,
    base_url: String,
}

impl TableNodeClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url: base_url.into() }
    }

    pub async fn ping(&self, timeout: std::time::Duration) -> bool {
        match self
            .http
            .get(format!("{}/ping", self.base_url))
            .timeout(timeout)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_server_error() => false,
            Ok(_) => true,
            Err(_) => false,
        }
    }

    pub async fn reserve_trial(
        &self,
        max_size: i64,
        retaining_capacity: &[String],
        timeout: std::time::Duration,
    ) -> Result<Option<Trial>, TableNodeClientError> {
        let body = crate::api::dto::TrialReserveParam {
            retaining_capacity: retaining_capacity.to_vec(),
            max_size,
        };
        let resp = self
            .http
            .post(format!("{}/trial/reserve", self.base_url))
            .timeout(timeout)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if status.is_server_error() {
            return Err(TableNodeClientError::Server { status: status.as_u16() });
        }
        if status.is_client_error() {
            let text = resp.text().await.unwrap_or_default();
            return Err(TableNodeClientError::Client { status: status.as_u16(), body: text });
        }
        let parsed: crate::api::dto::TrialReserveResponse = resp.json().await?;
        match parsed.trial {
            None => {
                log::info!("cannot reserve trial");
                Ok(None)
            }
            Some(model) => {
                let trial = Trial::from_model(model).map_err(|_| TableNodeClientError::Client {
                    status: 200,
                    body: "malformed trial payload".into(),
                })?;
                log::info!("reserved trial {}", trial.trial_id);
                Ok(Some(trial))
            }
        }
    }

    pub async fn register_trial(&self, trial: &Trial, timeout: std::time::Duration) -> Result<(), TableNodeClientError> {
        let model = trial.to_model().map_err(|_| TableNodeClientError::Client {
            status: 0,
            body: "failed to encode trial result".into(),
        })?;
        let body = crate::api::dto::TrialRegisterParam { trial: model };
        let resp = self
            .http
            .post(format!("{}/trial/register", self.base_url))
            .timeout(timeout)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if status.is_server_error() {
            return Err(TableNodeClientError::Server { status: status.as_u16() });
        }
        if status.is_client_error() {
            let text = resp.text().await.unwrap_or_default();
            return Err(TableNodeClientError::Client { status: status.as_u16(), body: text });
        }
        Ok(())
    }
}

/// Runs a trial to completion, producing the mappings to register back.
/// Stands in for the original's `BaseTrialRunner`/process-pool fan-out,
/// which is out of scope here: the caller supplies however it executes
/// the target function over the reserved parameter space.
pub trait TrialRunner: Send + Sync {
    fn run(&self, trial: &Trial) -> Vec<crate::trial::Mapping>;
}

/// Poll loop: reserve, run, register, repeat. Mirrors `Worker.start`/`_step`.
pub async fn run(config: WorkerConfig, runner: &dyn TrialRunner) -> anyhow::Result<()> {
    let client = TableNodeClient::new(config.table_node_url.clone());
    let timeout = std::time::Duration::from_secs(config.request_timeout_seconds);

    if !client.ping(timeout).await {
        anyhow::bail!("table node server not responding at {}", config.table_node_url);
    }

    loop {
        step(&client, &config, runner, timeout).await?;
    }
}

async fn step(
    client: &TableNodeClient,
    config: &WorkerConfig,
    runner: &dyn TrialRunner,
    timeout: std::time::Duration,
) -> anyhow::Result<()> {
    let trial = client
        .reserve_trial(config.max_size, &config.capability_set, timeout)
        .await?;
    let Some(mut trial) = trial else {
        log::info!("no trial, waiting {}s", config.poll_interval_seconds);
        tokio::time::sleep(std::time::Duration::from_secs(config.poll_interval_seconds)).await;
        return Ok(());
    };
    let mappings = runner.run(&trial);
    trial.result = Some(mappings);
    trial.status = crate::trial::TrialStatus::Done;
    client.register_trial(&trial, timeout).await?;
    Ok(())
}
