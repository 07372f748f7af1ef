//! SRFT 클라이언트 (수신자)
//!
//! 서버에 파일 요청(REQ)을 보내고, DATA 청크를 순서 복원하며 받아
//! 디스크에 쓴다. 매 수신마다 누적 ACK를 돌려보낸다. raw 소켓을
//! 쓰므로 root 권한이 필요하다.
//!
//! 사용법:
//!   sudo cargo run --release --bin srft-client -- \
//!     --ip <클라이언트IP> --server <서버IP> --file <파일명> [OPTIONS]

use std::fs::File;
use std::io::{BufWriter, Write};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use srft::raw::RECV_BUFFER_SIZE;
use srft::{Config, Packet, RawEndpoint, Receiver};

/// REQ 재전송 간격
const REQUEST_RETRY_INTERVAL: Duration = Duration::from_secs(2);

/// REQ 최대 재전송 횟수
const MAX_REQUEST_RETRIES: u32 = 10;

/// 전송 도중 서버가 이 시간 동안 침묵하면 수신 포기
const STALL_TIMEOUT: Duration = Duration::from_secs(30);

/// 클라이언트 설정
struct ClientArgs {
    ip: Option<Ipv4Addr>,
    server: Option<Ipv4Addr>,
    file: Option<String>,
    output: Option<PathBuf>,
    config: Config,
}

impl Default for ClientArgs {
    fn default() -> Self {
        Self {
            ip: None,
            server: None,
            file: None,
            output: None,
            config: Config::default(),
        }
    }
}

fn parse_args() -> ClientArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut client_args = ClientArgs::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--ip" | "-i" => {
                if i + 1 < args.len() {
                    client_args.ip = Some(args[i + 1].parse().expect("유효한 IPv4 주소 필요"));
                    i += 1;
                }
            }
            "--server" | "-s" => {
                if i + 1 < args.len() {
                    client_args.server = Some(args[i + 1].parse().expect("유효한 IPv4 주소 필요"));
                    i += 1;
                }
            }
            "--file" | "-f" => {
                if i + 1 < args.len() {
                    client_args.file = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--output" | "-o" => {
                if i + 1 < args.len() {
                    client_args.output = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--lossy" => {
                client_args.config = Config::lossy_network();
            }
            "--help" | "-h" => {
                println!(
                    r#"SRFT Client - Secure Reliable File Transfer 클라이언트

서버에 파일을 요청하고 raw IP/UDP 소켓으로 수신한다.
root 권한 필요 (SOCK_RAW).

사용법:
  sudo cargo run --release --bin srft-client -- \
    --ip <클라이언트IP> --server <서버IP> --file <파일명> [OPTIONS]

옵션:
  -i, --ip <ADDR>       이 클라이언트의 IPv4 주소 (필수)
  -s, --server <ADDR>   서버 IPv4 주소 (필수)
  -f, --file <NAME>     요청할 파일 이름 (필수)
  -o, --output <PATH>   저장 경로 (기본: 요청한 파일 이름)
  --lossy               불안정 네트워크 프리셋
  -h, --help            이 도움말 출력
"#
                );
                std::process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }

    client_args
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = parse_args();
    let (client_ip, server_ip, filename) = match (args.ip, args.server, args.file.clone()) {
        (Some(ip), Some(server), Some(file)) => (ip, server, file),
        _ => {
            eprintln!("--ip, --server, --file 인자가 모두 필요합니다. --help 참고");
            std::process::exit(1);
        }
    };
    let output_path = args
        .output
        .unwrap_or_else(|| PathBuf::from(filename.clone()));
    let config = args.config;

    info!("SRFT Client starting...");
    info!("Client: {}:{}", client_ip, config.client_port);
    info!("Server: {}:{}", server_ip, config.server_port);
    info!("Requesting file: {}", filename);

    let endpoint = RawEndpoint::bind(&config, client_ip, config.client_port, config.server_port)?;
    endpoint.set_peer(server_ip);

    // 디스크 쓰기는 별도 스레드로 분리 - 수신/ACK 루프를 막지 않는다
    let (chunk_tx, chunk_rx) = crossbeam_channel::unbounded::<Bytes>();
    let writer_thread = {
        let output_path = output_path.clone();
        std::thread::spawn(move || -> std::io::Result<u64> {
            let mut writer = BufWriter::new(File::create(&output_path)?);
            let mut written = 0u64;
            for chunk in chunk_rx {
                writer.write_all(&chunk)?;
                written += chunk.len() as u64;
            }
            writer.flush()?;
            Ok(written)
        })
    };

    // 파일 요청. 서버가 조용하면 일정 간격으로 다시 보낸다.
    endpoint.send_app_packet(&Packet::request(&filename))?;
    let mut last_request = Instant::now();
    let mut request_retries = 0u32;

    let start = Instant::now();
    let mut last_activity = Instant::now();
    let mut receiver = Receiver::new();
    let mut buf = vec![0u8; RECV_BUFFER_SIZE];

    loop {
        let (packet, _src) = match endpoint.recv_app_packet(&mut buf)? {
            Some(received) => received,
            None => {
                if receiver.packets_received == 0 {
                    // 아직 첫 DATA도 못 받았으면 REQ 재전송
                    if last_request.elapsed() >= REQUEST_RETRY_INTERVAL {
                        if request_retries >= MAX_REQUEST_RETRIES {
                            warn!("서버 응답 없음 - 요청 포기");
                            break;
                        }
                        info!("응답 없음, 파일 요청 재전송 ({})", request_retries + 1);
                        endpoint.send_app_packet(&Packet::request(&filename))?;
                        last_request = Instant::now();
                        request_retries += 1;
                    }
                } else if last_activity.elapsed() >= STALL_TIMEOUT {
                    // 전송이 시작된 뒤 서버가 죽으면 무한 대기하지 않는다
                    warn!(
                        "{:?} 동안 수신 없음 - 전송 중단 (조립 미완료)",
                        STALL_TIMEOUT
                    );
                    break;
                }
                continue;
            }
        };

        last_activity = Instant::now();

        if !packet.is_data() && !packet.is_fin() {
            continue;
        }

        for chunk in receiver.accept(&packet) {
            chunk_tx.send(chunk)?;
        }

        // 중복이어도 현재 누적 ACK를 다시 보낸다 (ACK 유실 복구)
        if let Some(ack) = receiver.cumulative_ack() {
            endpoint.send_app_packet(&ack)?;
        }

        if receiver.is_complete() {
            receiver.warn_if_leftover();
            break;
        }
    }

    drop(chunk_tx);
    let written = writer_thread.join().expect("writer 스레드 패닉")?;

    let elapsed = start.elapsed();
    info!(
        "수신 완료: {} bytes -> {:?} | {:.2}s | 패킷 {} (중복 {})",
        written,
        output_path,
        elapsed.as_secs_f64(),
        receiver.packets_received,
        receiver.duplicates,
    );

    Ok(())
}
