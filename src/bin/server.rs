//! SRFT 서버 (송신자)
//!
//! 클라이언트의 파일 요청(REQ)을 기다렸다가, 요청된 파일을 슬라이딩
//! 윈도우 송신자로 전송한다. raw 소켓을 쓰므로 root 권한이 필요하다.
//!
//! 사용법:
//!   sudo cargo run --release --bin srft-server -- --ip <서버IP> [OPTIONS]
//!
//! 예시:
//!   sudo cargo run --release --bin srft-server -- --ip 192.168.1.100 --dir ./test_files

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use srft::packet::{FLAG_DATA, FLAG_FIN};
use srft::raw::RECV_BUFFER_SIZE;
use srft::{Config, RawEndpoint, Sender, TransferStats};

/// 서버 설정
struct ServerArgs {
    ip: Option<Ipv4Addr>,
    files_dir: PathBuf,
    report_path: PathBuf,
    config: Config,
}

impl Default for ServerArgs {
    fn default() -> Self {
        Self {
            ip: None,
            files_dir: PathBuf::from("./test_files"),
            report_path: PathBuf::from("srft_report.txt"),
            config: Config::default(),
        }
    }
}

fn parse_args() -> ServerArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut server_args = ServerArgs::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--ip" | "-i" => {
                if i + 1 < args.len() {
                    server_args.ip = Some(args[i + 1].parse().expect("유효한 IPv4 주소 필요"));
                    i += 1;
                }
            }
            "--dir" | "-d" => {
                if i + 1 < args.len() {
                    server_args.files_dir = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--report" => {
                if i + 1 < args.len() {
                    server_args.report_path = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--lossy" => {
                server_args.config = Config::lossy_network();
            }
            "--help" | "-h" => {
                println!(
                    r#"SRFT Server - Secure Reliable File Transfer 서버

raw IP/UDP 소켓 위에서 슬라이딩 윈도우로 파일을 전송한다.
root 권한 필요 (SOCK_RAW).

사용법:
  sudo cargo run --release --bin srft-server -- --ip <서버IP> [OPTIONS]

옵션:
  -i, --ip <ADDR>       이 서버의 IPv4 주소 (필수)
  -d, --dir <PATH>      요청 파일을 찾을 디렉터리 (기본: ./test_files)
  --report <PATH>       통계 보고서 경로 (기본: srft_report.txt)
  --lossy               불안정 네트워크 프리셋 (긴 타임아웃, 많은 재시도)
  -h, --help            이 도움말 출력

예시:
  sudo cargo run --release --bin srft-server -- --ip 192.168.1.100 --dir ./test_files
"#
                );
                std::process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }

    server_args
}

/// 파일 하나를 클라이언트로 전송한다.
fn send_file(
    endpoint: Arc<RawEndpoint>,
    config: &Config,
    path: &std::path::Path,
    filename: &str,
) -> srft::Result<TransferStats> {
    let data = std::fs::read(path)?;

    let mut stats = TransferStats::new();
    stats.file_name = filename.to_string();
    stats.file_size = data.len() as u64;

    info!("파일 전송 시작: {} ({} bytes)", filename, data.len());

    let sender = Arc::new(Sender::new(config.clone(), endpoint.clone())?);

    // ACK 리스너: 수신 패킷 중 ACK만 골라 송신자에 전달
    let running = Arc::new(AtomicBool::new(true));
    let acks_received = Arc::new(AtomicU64::new(0));
    let ack_thread = {
        let endpoint = endpoint.clone();
        let sender = sender.clone();
        let running = running.clone();
        let acks_received = acks_received.clone();
        std::thread::spawn(move || {
            let mut buf = vec![0u8; RECV_BUFFER_SIZE];
            while running.load(Ordering::SeqCst) {
                match endpoint.recv_app_packet(&mut buf) {
                    Ok(Some((packet, _src))) if packet.is_ack() => {
                        sender.handle_ack(packet.ack_num);
                        acks_received.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(_) => {}
                    Err(e) => warn!("수신 에러: {}", e),
                }
            }
        })
    };

    // 청크 전송 (윈도우가 차면 send가 알아서 블록)
    for chunk in data.chunks(config.max_payload_size) {
        sender.send(Bytes::copy_from_slice(chunk), FLAG_DATA)?;
    }

    // 빈 FIN으로 마무리
    sender.send(Bytes::new(), FLAG_FIN)?;

    info!("모든 청크 전송, ACK 대기 중...");
    if sender.wait_for_completion(Duration::from_secs(60)) {
        info!("모든 패킷 확인 완료");
    } else {
        warn!("ACK 대기 시간 초과 - 통계는 그대로 보고");
    }

    let (packets_sent, retransmissions) = sender.counters();
    stats.packets_sent = packets_sent;
    stats.retransmissions = retransmissions;
    stats.packets_received = acks_received.load(Ordering::Relaxed);
    stats.finish();

    running.store(false, Ordering::SeqCst);
    sender.stop();
    let _ = ack_thread.join();

    Ok(stats)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = parse_args();
    let server_ip = match args.ip {
        Some(ip) => ip,
        None => {
            eprintln!("--ip <서버IP> 인자가 필요합니다. --help 참고");
            std::process::exit(1);
        }
    };
    let config = args.config;

    info!("SRFT Server starting...");
    info!("Server IP: {}:{}", server_ip, config.server_port);
    info!("Files directory: {:?}", args.files_dir);
    info!("Window size: {}", config.window_size);
    info!("Timeout: {:?}", config.timeout_interval);

    let endpoint = Arc::new(RawEndpoint::bind(
        &config,
        server_ip,
        config.server_port,
        config.client_port,
    )?);

    info!("파일 요청 대기 중...");

    let mut buf = vec![0u8; RECV_BUFFER_SIZE];
    loop {
        let (packet, src_ip) = match endpoint.recv_app_packet(&mut buf)? {
            Some(received) => received,
            None => continue,
        };

        if !packet.is_request() {
            continue;
        }

        let filename = match std::str::from_utf8(&packet.payload) {
            Ok(name) => name.to_string(),
            Err(_) => {
                warn!("{} - 무시 (src={})", srft::Error::InvalidRequest, src_ip);
                continue;
            }
        };

        info!("'{}' 요청 수신 (from {})", filename, src_ip);

        let path = args.files_dir.join(&filename);
        if !path.is_file() {
            let err = srft::Error::FileNotFound {
                path: path.display().to_string(),
            };
            warn!("{} - 다음 요청 대기", err);
            continue;
        }

        endpoint.set_peer(src_ip);

        let stats = send_file(endpoint.clone(), &config, &path, &filename)?;

        info!("{}", stats.summary());
        if let Err(e) = stats.write_report(&args.report_path) {
            warn!("보고서 작성 실패: {}", e);
        } else {
            info!("보고서 작성: {:?}", args.report_path);
        }
        break;
    }

    info!("Server finished.");
    Ok(())
}
