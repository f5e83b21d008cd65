//! # Frame Transport
//!
//! The runtime hands this node per-user file descriptors: requests arrive
//! as raw UTF-8 JSON on the input descriptor, responses leave as
//! length-prefixed frames on the output descriptor:
//!
//! ```text
//! +----------------------------+------------------+
//! | Length (4 bytes, BE)       | UTF-8 JSON       |
//! +----------------------------+------------------+
//! ```
//!
//! Input accepts either a single request object or an array of requests;
//! each request produces exactly one response frame, in order. A payload
//! that does not parse as JSON still produces a frame — the failure
//! envelope — so the runtime never waits on a response that is not coming.

use std::os::fd::FromRawFd;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use xvault_contract::error::ContractError;
use xvault_contract::ops::{Dispatcher, Request, Response};

/// Upper bound on a single response frame. Far above anything the contract
/// emits; a frame this large means a bug, not a big vault.
const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Read requests from `input_fd`, process them against the dispatcher
/// within `round_key`, and write one response frame per request to
/// `output_fd`. Returns the number of requests processed.
pub async fn serve_round(
    dispatcher: &mut Dispatcher,
    input_fd: i32,
    output_fd: i32,
    round_key: &str,
) -> Result<usize> {
    // SAFETY: the runtime owns these descriptors and hands them to exactly
    // one node process; adopting them here is the contract of the adapter.
    let std_input = unsafe { std::fs::File::from_raw_fd(input_fd) };
    let std_output = unsafe { std::fs::File::from_raw_fd(output_fd) };
    let mut input = tokio::fs::File::from_std(std_input);
    let mut output = tokio::fs::File::from_std(std_output);

    let mut raw = Vec::new();
    input
        .read_to_end(&mut raw)
        .await
        .with_context(|| format!("failed to read request bytes from fd {input_fd}"))?;

    let mut processed = 0usize;
    match parse_requests(&raw) {
        Ok(requests) => {
            for request in &requests {
                let response = dispatcher.handle(request, round_key).await;
                write_frame(&mut output, &response).await?;
                processed += 1;
            }
        }
        Err(err) => {
            tracing::warn!("request parse failure: {err}");
            let failure = Response::failure(&ContractError::invalid_input(format!(
                "request is not valid JSON: {err}"
            )));
            write_frame(&mut output, &failure).await?;
        }
    }

    output.flush().await.context("failed to flush response frames")?;
    Ok(processed)
}

/// Parse the raw input buffer: one request object, or an array of them.
pub fn parse_requests(raw: &[u8]) -> Result<Vec<Request>, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_slice(raw)?;
    match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Request>, _>>(),
        other => Ok(vec![serde_json::from_value(other)?]),
    }
}

/// Encode a response as a length-prefixed frame.
pub fn encode_frame(response: &Response) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(response).context("response serialization failed")?;
    anyhow::ensure!(
        body.len() <= MAX_FRAME_SIZE,
        "response frame exceeds {MAX_FRAME_SIZE} bytes"
    );

    let mut frame = Vec::with_capacity(4 + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

async fn write_frame(
    output: &mut tokio::fs::File,
    response: &Response,
) -> Result<()> {
    let frame = encode_frame(response)?;
    output
        .write_all(&frame)
        .await
        .context("failed to write response frame")
}
