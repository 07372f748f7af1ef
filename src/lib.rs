//! # SRFT (Secure Reliable File Transfer)
//!
//! Raw IP/UDP 소켓 기반 신뢰성 파일 전송 프로토콜
//!
//! ## 핵심 특징
//! - **Raw 소켓**: IP/UDP 헤더를 직접 조립 (OS 전송 계층 미사용)
//! - **슬라이딩 윈도우**: 최대 WINDOW_SIZE개 패킷 동시 in-flight
//! - **누적 ACK**: "N번까지 전부 수신" 방식의 확인 응답
//! - **타임아웃 재전송**: 무응답 패킷 자동 재송신
//! - **인터넷 체크섬**: 16비트 1의 보수 합으로 손상 검출
//!
//! 전송 단위는 3계층 중첩 헤더로 구성된다:
//! IP(20바이트) + UDP(8바이트) + 앱 헤더(14바이트) + 페이로드

pub mod checksum;
pub mod config;
pub mod error;
pub mod ip;
pub mod packet;
pub mod raw;
pub mod receiver;
pub mod sender;
pub mod stats;
pub mod udp;

pub use config::Config;
pub use error::{Error, Result};
pub use ip::IpHeader;
pub use packet::Packet;
pub use raw::RawEndpoint;
pub use receiver::Receiver;
pub use sender::{PacketSink, Sender};
pub use stats::TransferStats;
pub use udp::UdpHeader;

/// IP 프로토콜 번호 (UDP)
pub const IP_PROTOCOL_UDP: u8 = 17;
