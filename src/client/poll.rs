//! Process status polling.
//!
//! A process status resource answers GET with JSON containing a `state`.
//! `"processing"` means "ask again later"; anything else, error states
//! included, is final.
//!
//! [`poll_until_done`] GETs the resource immediately, then waits according to a
//! [`BackoffSchedule`] between attempts until the state is final. Protocol
//! violations (non-2xx status, missing `state`) fail at once and are never retried.

use crate::client::config::ClientConfig;
use crate::client::dispatcher::RequestDispatcher;
use crate::client::utils::BackoffSchedule;
use crate::error::{AffinityError, Result};
use crate::types::{ProcessStatus, RequestOptions};
use tokio::time::sleep;

/// GET a process status resource once and validate it.
pub async fn current_process_status(
    dispatcher: &RequestDispatcher,
    resource: &str,
    options: RequestOptions,
) -> Result<ProcessStatus> {
    let res = dispatcher.get_with(resource, options).await?;

    if !res.ok() {
        return Err(AffinityError::ProcessStatusRequestFailed {
            status: res.status().as_u16(),
            status_text: res.status_text().to_string(),
        });
    }

    ProcessStatus::from_value(res.json_value().await?)
}

/// Poll a process status resource until its state is no longer `"processing"`.
///
/// The first GET happens immediately. Waits between attempts start at
/// `config.initial_poll_delay_ms`, grow by `config.poll_backoff_multiplier`
/// and stop growing at `config.max_poll_delay_ms`.
///
/// There is no overall deadline; wrap the call in [`tokio::time::timeout`] if one is needed.
pub async fn poll_until_done(
    dispatcher: &RequestDispatcher,
    resource: &str,
    options: RequestOptions,
    config: &ClientConfig,
) -> Result<ProcessStatus> {
    let mut waits = BackoffSchedule::new(
        config.initial_poll_delay(),
        config.poll_backoff_multiplier,
        config.max_poll_delay(),
    );
    let mut attempt: u32 = 1;

    loop {
        let status = current_process_status(dispatcher, resource, options.clone()).await?;
        if !status.is_processing() {
            if config.enable_logging {
                tracing::debug!(resource, attempt, state = status.state(), "process finished");
            }
            return Ok(status);
        }

        let delay = waits.next_delay();
        if config.enable_logging {
            tracing::debug!(
                "process {} still processing (attempt {}), polling again after {:?}",
                resource,
                attempt,
                delay
            );
        }
        sleep(delay).await;
        attempt += 1;
    }
}
