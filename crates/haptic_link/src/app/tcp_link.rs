use std::io;
use std::time::Duration;

use async_trait::async_trait;
use haptic_engine::{ActuatorError, ActuatorLink};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const WRITE_TIMEOUT: Duration = Duration::from_millis(500);

/// Newline-delimited text link to an actuator bridge.
#[derive(Debug, Default)]
pub(crate) struct TcpActuatorLink {
    stream: Mutex<Option<TcpStream>>,
}

#[async_trait]
impl ActuatorLink for TcpActuatorLink {
    async fn connect(&self, address: &str) -> Result<(), ActuatorError> {
        let unreachable = |source: io::Error| ActuatorError::Unreachable {
            address: address.to_string(),
            source,
        };
        let stream = timeout(CONNECT_TIMEOUT, TcpStream::connect(address))
            .await
            .map_err(|_| unreachable(io::Error::from(io::ErrorKind::TimedOut)))?
            .map_err(unreachable)?;
        stream.set_nodelay(true)?;

        let mut guard = self.stream.lock().await;
        let stream = guard.insert(stream);
        write_line(stream, &hello_line_text(), WRITE_TIMEOUT).await?;
        info!(address, "actuator_link_open");
        Ok(())
    }

    async fn command(&self, device: &str, action: &str, intensity: f64) -> Result<(), ActuatorError> {
        let line = command_line_text(device, action, intensity);
        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or(ActuatorError::NotConnected)?;
        write_line(stream, &line, WRITE_TIMEOUT).await?;
        debug!(line = %line, "actuator_line_sent");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ActuatorError> {
        let Some(mut stream) = self.stream.lock().await.take() else {
            return Err(ActuatorError::NotConnected);
        };
        write_line(&mut stream, &bye_line_text(), WRITE_TIMEOUT).await?;
        timeout(WRITE_TIMEOUT, stream.shutdown())
            .await
            .map_err(|_| io::Error::from(io::ErrorKind::TimedOut))??;
        Ok(())
    }
}

/// A bridge that stops reading fills the socket buffer; give up after `limit`.
async fn write_line<W>(writer: &mut W, line: &str, limit: Duration) -> Result<(), ActuatorError>
where
    W: AsyncWrite + Unpin,
{
    timeout(limit, writer.write_all(&encode_line_payload(line)))
        .await
        .map_err(|_| io::Error::from(io::ErrorKind::TimedOut))??;
    Ok(())
}

fn hello_line_text() -> String {
    "haptic.hello v1".to_string()
}

fn bye_line_text() -> String {
    "haptic.bye v1".to_string()
}

fn command_line_text(device: &str, action: &str, intensity: f64) -> String {
    format!("haptic.cmd v1 device:{device} action:{action} intensity:{intensity:.2}")
}

fn encode_line_payload(line: &str) -> Vec<u8> {
    let mut payload = Vec::with_capacity(line.len() + 1);
    payload.extend_from_slice(line.as_bytes());
    payload.push(b'\n');
    payload
}
