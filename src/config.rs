use crate::exchange::ExchangeError;
use crate::geometry::FrameGeometry;
use crate::sink::HexLayout;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_ADDRESS: &str = "192.168.1.20";
pub const DEFAULT_PORT: u16 = 6001;
/// One Ethernet MSS.
pub const DEFAULT_CHUNK_BYTES: usize = 1460;
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_DUMP_FRAMES: u64 = 10;

/* ----------------------------------------------------------------
   Exchange (what the coordinator needs)
---------------------------------------------------------------- */
#[derive(Clone, Debug)]
pub struct ExchangeConfig {
    pub geometry: FrameGeometry,
    pub max_chunk_bytes: usize,
    pub send_timeout: Duration,
    pub recv_timeout: Duration,
}

impl ExchangeConfig {
    pub fn new(geometry: FrameGeometry) -> Self {
        Self {
            geometry,
            max_chunk_bytes: DEFAULT_CHUNK_BYTES,
            send_timeout: DEFAULT_IO_TIMEOUT,
            recv_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    pub fn with_max_chunk_bytes(mut self, max_chunk_bytes: usize) -> Self {
        self.max_chunk_bytes = max_chunk_bytes;
        self
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    pub fn with_recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = timeout;
        self
    }

    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    pub fn max_chunk_bytes(&self) -> usize {
        self.max_chunk_bytes
    }

    pub fn send_timeout(&self) -> Duration {
        self.send_timeout
    }

    pub fn recv_timeout(&self) -> Duration {
        self.recv_timeout
    }

    pub fn validate(&self) -> Result<(), ExchangeError> {
        self.geometry.validate()?;
        if self.max_chunk_bytes == 0 {
            return Err(ExchangeError::Config("max_chunk_bytes must be positive".into()));
        }
        if self.send_timeout.is_zero() || self.recv_timeout.is_zero() {
            return Err(ExchangeError::Config("I/O timeouts must be positive".into()));
        }
        Ok(())
    }
}

/* ----------------------------------------------------------------
   Transport (socket knobs)
---------------------------------------------------------------- */
#[derive(Clone, Debug)]
pub struct TransportConfig {
    pub address: String,
    pub port: u16,
    pub no_delay: bool,
    pub send_buffer_hint: Option<u32>,
    pub recv_buffer_hint: Option<u32>,
    pub connect_timeout: Duration,
}

impl TransportConfig {
    pub fn new(address: String, port: u16) -> Self {
        Self {
            address,
            port,
            no_delay: true,
            send_buffer_hint: None,
            recv_buffer_hint: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_no_delay(mut self, no_delay: bool) -> Self {
        self.no_delay = no_delay;
        self
    }

    pub fn with_buffer_hints(mut self, send: Option<u32>, recv: Option<u32>) -> Self {
        self.send_buffer_hint = send;
        self.recv_buffer_hint = recv;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// `host:port`, ready for `ToSocketAddrs`.
    pub fn remote(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    pub fn no_delay(&self) -> bool {
        self.no_delay
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

/* ----------------------------------------------------------------
   Harness file (TOML)
---------------------------------------------------------------- */
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    pub remote_address: String,
    pub remote_port: u16,
    pub input_frame_bytes: u64,
    pub output_frame_bytes: u64,
    pub max_chunk_bytes: usize,
    pub send_timeout_ms: u64,
    pub recv_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub dump_first_frames: u64,
    pub dump_row_pixels: usize,
    pub dump_bytes_per_pixel: usize,
    pub no_delay: bool,
    pub send_buffer_hint: Option<u32>,
    pub recv_buffer_hint: Option<u32>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        let geometry = FrameGeometry::default();
        let layout = HexLayout::default();
        Self {
            remote_address: DEFAULT_ADDRESS.to_string(),
            remote_port: DEFAULT_PORT,
            input_frame_bytes: geometry.input_frame_bytes,
            output_frame_bytes: geometry.output_frame_bytes,
            max_chunk_bytes: DEFAULT_CHUNK_BYTES,
            send_timeout_ms: DEFAULT_IO_TIMEOUT.as_millis() as u64,
            recv_timeout_ms: DEFAULT_IO_TIMEOUT.as_millis() as u64,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT.as_millis() as u64,
            dump_first_frames: DEFAULT_DUMP_FRAMES,
            dump_row_pixels: layout.row_pixels,
            dump_bytes_per_pixel: layout.bytes_per_pixel,
            no_delay: true,
            send_buffer_hint: None,
            recv_buffer_hint: None,
        }
    }
}

impl HarnessConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ExchangeError> {
        toml::from_str(text).map_err(|e| ExchangeError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ExchangeError> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ExchangeError::Config(format!("{}: {e}", path.as_ref().display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn geometry(&self) -> FrameGeometry {
        FrameGeometry::new(self.input_frame_bytes, self.output_frame_bytes)
    }

    pub fn hex_layout(&self) -> HexLayout {
        HexLayout::new(self.dump_row_pixels, self.dump_bytes_per_pixel)
    }

    pub fn exchange(&self) -> ExchangeConfig {
        ExchangeConfig::new(self.geometry())
            .with_max_chunk_bytes(self.max_chunk_bytes)
            .with_send_timeout(Duration::from_millis(self.send_timeout_ms))
            .with_recv_timeout(Duration::from_millis(self.recv_timeout_ms))
    }

    /// Buffer hints default to one frame in each direction.
    pub fn transport(&self) -> TransportConfig {
        let clamp = |n: u64| u32::try_from(n).unwrap_or(u32::MAX);
        TransportConfig::new(self.remote_address.clone(), self.remote_port)
            .with_no_delay(self.no_delay)
            .with_buffer_hints(
                self.send_buffer_hint.or(Some(clamp(self.input_frame_bytes))),
                self.recv_buffer_hint.or(Some(clamp(self.output_frame_bytes))),
            )
            .with_connect_timeout(Duration::from_millis(self.connect_timeout_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_board_defaults() {
        let cfg = HarnessConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.remote_port, 6001);
        assert_eq!(cfg.geometry(), FrameGeometry::default());
        assert_eq!(cfg.exchange().max_chunk_bytes(), 1460);
        assert_eq!(cfg.transport().recv_buffer_hint, Some(3_686_400));
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = HarnessConfig::from_toml_str(
            r#"
            remote_address = "127.0.0.1"
            remote_port = 7000
            input_frame_bytes = 16
            output_frame_bytes = 64
            recv_timeout_ms = 250
            dump_first_frames = 2
            "#,
        )
        .unwrap();
        assert_eq!(cfg.transport().remote(), "127.0.0.1:7000");
        assert_eq!(cfg.exchange().recv_timeout(), Duration::from_millis(250));
        assert_eq!(cfg.dump_first_frames, 2);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            HarnessConfig::from_toml_str("frame_size = 3"),
            Err(ExchangeError::Config(_))
        ));
    }

    #[test]
    fn zero_chunk_is_invalid() {
        let cfg = ExchangeConfig::new(FrameGeometry::new(4, 4)).with_max_chunk_bytes(0);
        assert!(cfg.validate().is_err());
    }
}
