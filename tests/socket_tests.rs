use std::time::Duration;

use frame_duplex::loopback::{LoopbackDevice, tile};
use frame_duplex::{
    ExchangeConfig, ExchangeCoordinator, ExchangeError, FrameGeometry, MemorySink, MemorySource,
    TransportConfig, transport,
};
use tokio::net::TcpListener;

/* ------------------------------------------------------------------------ */
/* TCP against the loopback device                                          */
/* ------------------------------------------------------------------------ */
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn exchange_over_tcp_loopback() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();

    let geometry = FrameGeometry::from_pixels((32, 18, 3), (128, 72, 4));
    let device = LoopbackDevice::bind("127.0.0.1:0", geometry, tile(geometry.output_len()))
        .await
        .expect("bind");
    let port = device.local_addr().unwrap().port();
    let device_jh = tokio::spawn(async move { device.serve_one().await });

    let cfg = TransportConfig::new("127.0.0.1".into(), port)
        .with_buffer_hints(Some(geometry.input_frame_bytes as u32), Some(geometry.output_frame_bytes as u32));
    let stream = transport::connect(&cfg).await.expect("connect");
    let (reader, writer) = stream.into_split();

    let frames = 6;
    let input: Vec<u8> = (0..frames * geometry.input_len()).map(|i| (i % 97) as u8).collect();
    let outcome = ExchangeCoordinator::new(ExchangeConfig::new(geometry))
        .run_split(MemorySource::new(input), MemorySink::new(), reader, writer)
        .await
        .unwrap();

    assert!(outcome.session.is_success(), "{:?}", outcome.session.failure);
    assert_eq!(outcome.session.frames_sent, frames as u64);
    assert_eq!(outcome.session.frames_received, frames as u64);
    assert_eq!(outcome.sink.concat().len(), frames * geometry.output_len());

    let answered = tokio::time::timeout(Duration::from_secs(2), device_jh)
        .await
        .expect("device did not finish")
        .unwrap()
        .unwrap();
    assert_eq!(answered, frames as u64);
}

#[tokio::test]
async fn connect_to_closed_port_fails() {
    // Reserve a free port and release it again.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let cfg = TransportConfig::new("127.0.0.1".into(), port)
        .with_connect_timeout(Duration::from_secs(2));
    match transport::connect(&cfg).await {
        Err(ExchangeError::Connect { address, .. }) => {
            assert_eq!(address, format!("127.0.0.1:{port}"))
        }
        other => panic!("expected Connect error, got {:?}", other.map(|_| ())),
    }
}
