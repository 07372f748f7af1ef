//! 송신자-수신자 종단 통합 테스트
//!
//! 실제 raw 소켓 대신 채널로 만든 인메모리 링크를 쓴다. 손실 링크
//! 테스트는 시드 고정 난수로 패킷과 ACK를 떨어뜨려 재전송 경로까지
//! 검증한다.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use srft::packet::{FLAG_DATA, FLAG_FIN};
use srft::sender::PacketSink;
use srft::{Config, Packet, Receiver, Result, Sender};

/// 패킷을 채널로 전달하면서 확률적으로 유실시키는 링크
struct LossyLink {
    tx: crossbeam_channel::Sender<Packet>,
    rng: Mutex<StdRng>,
    drop_rate: f64,
}

impl PacketSink for LossyLink {
    fn send_packet(&self, packet: &Packet) -> Result<()> {
        if self.rng.lock().gen::<f64>() < self.drop_rate {
            return Ok(()); // 전선에서 사라짐
        }
        let _ = self.tx.send(packet.clone());
        Ok(())
    }
}

fn fast_config() -> Config {
    Config {
        timeout_interval: Duration::from_millis(40),
        timer_interval: Duration::from_millis(10),
        send_poll_interval: Duration::from_millis(2),
        completion_poll_interval: Duration::from_millis(5),
        ..Config::default()
    }
}

/// 데이터를 청크로 쪼개 보내고, 수신 스레드가 조립한 결과를 돌려준다.
///
/// `drop_rate`는 DATA와 ACK 양쪽에 같은 확률로 적용된다.
fn run_transfer(data: &[u8], config: Config, drop_rate: f64, seed: u64) -> Vec<u8> {
    let (tx, rx) = crossbeam_channel::unbounded::<Packet>();
    let link = Arc::new(LossyLink {
        tx,
        rng: Mutex::new(StdRng::seed_from_u64(seed)),
        drop_rate,
    });

    let sender = Arc::new(Sender::new(config.clone(), link).unwrap());

    // 수신측: 조립 + 누적 ACK (ACK도 같은 확률로 유실)
    let rx_thread = {
        let sender = sender.clone();
        thread::spawn(move || {
            let mut receiver = Receiver::new();
            let mut assembled = Vec::new();
            let mut ack_rng = StdRng::seed_from_u64(seed.wrapping_add(1));

            loop {
                let packet = match rx.recv_timeout(Duration::from_millis(500)) {
                    Ok(packet) => packet,
                    // 완료 후 재전송도 끊겼으면 종료
                    Err(_) if receiver.is_complete() => break,
                    Err(_) => panic!("수신 고갈: 조립 미완료 상태에서 링크 침묵"),
                };

                for chunk in receiver.accept(&packet) {
                    assembled.extend_from_slice(&chunk);
                }

                if ack_rng.gen::<f64>() < drop_rate {
                    continue; // ACK 유실 - 송신측 재전송이 복구해야 한다
                }
                if let Some(ack) = receiver.cumulative_ack() {
                    sender.handle_ack(ack.ack_num);
                }
            }

            receiver.warn_if_leftover();
            assembled
        })
    };

    for chunk in data.chunks(config.max_payload_size) {
        sender
            .send(Bytes::copy_from_slice(chunk), FLAG_DATA)
            .unwrap();
    }
    sender.send(Bytes::new(), FLAG_FIN).unwrap();

    assert!(
        sender.wait_for_completion(Duration::from_secs(10)),
        "송신 미완료: in-flight {}개 잔존",
        sender.in_flight()
    );
    sender.stop();

    rx_thread.join().unwrap()
}

#[test]
fn test_transfer_over_reliable_link() {
    let mut data = vec![0u8; 16 * 1024 + 123];
    StdRng::seed_from_u64(42).fill_bytes(&mut data);

    let received = run_transfer(&data, fast_config(), 0.0, 42);
    assert_eq!(received, data);
}

#[test]
fn test_transfer_over_lossy_link() {
    let mut data = vec![0u8; 8 * 1024 + 7];
    StdRng::seed_from_u64(7).fill_bytes(&mut data);

    // DATA/ACK 각 25% 유실 - 재전송만으로 바이트 동일 복원
    let received = run_transfer(&data, fast_config(), 0.25, 7);
    assert_eq!(received, data);
}

#[test]
fn test_empty_file_fin_only() {
    let received = run_transfer(&[], fast_config(), 0.0, 1);
    assert!(received.is_empty());
}

#[test]
fn test_transfer_from_disk_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let src_path = dir.path().join("source.bin");
    let dst_path = dir.path().join("copy.bin");

    let mut data = vec![0u8; 4096];
    StdRng::seed_from_u64(99).fill_bytes(&mut data);
    std::fs::write(&src_path, &data).unwrap();

    let file_bytes = std::fs::read(&src_path).unwrap();
    let received = run_transfer(&file_bytes, fast_config(), 0.1, 99);
    std::fs::write(&dst_path, &received).unwrap();

    assert_eq!(std::fs::read(&dst_path).unwrap(), data);
}
