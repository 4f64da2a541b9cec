//! Async event reader and writer

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{Event, Result, TransportError, PROTOCOL_VERSION};

/// Longest accepted header line
pub const MAX_HEADER_LENGTH: usize = 64 * 1024;
/// Largest accepted data section
pub const MAX_DATA_LENGTH: usize = 1024 * 1024;
/// Largest accepted binary payload
pub const MAX_PAYLOAD_LENGTH: usize = 64 * 1024 * 1024;

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    /// Inline data, accepted on read only
    #[serde(default, skip_serializing)]
    data: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload_length: Option<usize>,
}

fn check_limit(what: &'static str, length: usize, max: usize) -> Result<()> {
    if length > max {
        return Err(TransportError::TooLarge { what, length, max });
    }
    Ok(())
}

/// Read the next event.
///
/// Returns `Ok(None)` on a clean end of stream before a header. Blank lines
/// between events are skipped.
pub async fn read_event<R>(reader: &mut R) -> Result<Option<Event>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    loop {
        line.clear();
        let read = (&mut *reader)
            .take(MAX_HEADER_LENGTH as u64 + 1)
            .read_until(b'\n', &mut line)
            .await?;
        if read == 0 {
            return Ok(None);
        }
        if line.last() != Some(&b'\n') {
            if line.len() > MAX_HEADER_LENGTH {
                return Err(TransportError::TooLarge {
                    what: "header",
                    length: line.len(),
                    max: MAX_HEADER_LENGTH,
                });
            }
            return Err(TransportError::InvalidHeader("stream ended inside header".to_string()));
        }
        if line.iter().any(|b| !b.is_ascii_whitespace()) {
            break;
        }
    }

    let header: Header = serde_json::from_slice(&line)
        .map_err(|e| TransportError::InvalidHeader(format!("{}", e)))?;

    let mut data = header.data.unwrap_or_default();

    if let Some(length) = header.data_length.filter(|&n| n > 0) {
        check_limit("data", length, MAX_DATA_LENGTH)?;
        let mut buf = vec![0u8; length];
        reader.read_exact(&mut buf).await?;
        match serde_json::from_slice::<Value>(&buf)? {
            Value::Object(extra) => data.extend(extra),
            other => {
                return Err(TransportError::InvalidHeader(format!(
                    "data section must be an object, got {}",
                    other
                )))
            }
        }
    }

    let payload = match header.payload_length {
        Some(length) => {
            check_limit("payload", length, MAX_PAYLOAD_LENGTH)?;
            let mut buf = vec![0u8; length];
            reader.read_exact(&mut buf).await?;
            Some(Bytes::from(buf))
        }
        None => None,
    };

    tracing::trace!(
        event_type = %header.event_type,
        data_fields = data.len(),
        payload_bytes = payload.as_ref().map_or(0, Bytes::len),
        "Read event"
    );

    Ok(Some(Event {
        event_type: header.event_type,
        data,
        payload,
    }))
}

/// Write one event and flush
pub async fn write_event<W>(writer: &mut W, event: &Event) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let data = if event.data.is_empty() {
        None
    } else {
        Some(serde_json::to_vec(&event.data)?)
    };

    let header = Header {
        event_type: event.event_type.clone(),
        version: Some(PROTOCOL_VERSION.to_string()),
        data: None,
        data_length: data.as_ref().map(Vec::len),
        payload_length: event.payload.as_ref().map(Bytes::len),
    };

    let mut line = serde_json::to_vec(&header)?;
    line.push(b'\n');
    writer.write_all(&line).await?;

    if let Some(data) = &data {
        writer.write_all(data).await?;
    }
    if let Some(payload) = &event.payload {
        writer.write_all(payload).await?;
    }

    writer.flush().await?;
    Ok(())
}
