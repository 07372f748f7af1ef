//! 프로토콜 설정
//!
//! 모든 컴포넌트가 같은 `Config` 값을 생성 시점에 넘겨받는다.
//! 전역 조회 없음.

use std::time::Duration;

/// SRFT 프로토콜 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// 서버 포트 (고정, 협상 없음)
    pub server_port: u16,

    /// 클라이언트 포트 (고정, 협상 없음)
    pub client_port: u16,

    /// 패킷당 최대 페이로드 크기 (바이트)
    pub max_payload_size: usize,

    /// 슬라이딩 윈도우 크기 (동시 in-flight 패킷 수)
    pub window_size: u32,

    /// 재전송 타임아웃 (이 시간 동안 ACK 없으면 재송신)
    pub timeout_interval: Duration,

    /// 패킷당 최대 재전송 횟수
    pub max_retries: u32,

    /// 윈도우 가득 찼을 때 send의 폴링 간격
    pub send_poll_interval: Duration,

    /// 타임아웃 검사 스레드의 스캔 주기
    pub timer_interval: Duration,

    /// wait_for_completion의 폴링 간격
    pub completion_poll_interval: Duration,

    /// raw 소켓 수신 타임아웃 (종료 플래그 확인 주기)
    pub recv_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 12345,
            client_port: 12346,
            max_payload_size: 1024,
            window_size: 4,
            timeout_interval: Duration::from_millis(500),
            max_retries: 10,
            send_poll_interval: Duration::from_millis(10),
            timer_interval: Duration::from_millis(50),
            completion_poll_interval: Duration::from_millis(50),
            recv_timeout: Duration::from_millis(500),
        }
    }
}

impl Config {
    /// 새 설정 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 불안정한 네트워크용 설정 (긴 타임아웃, 많은 재시도)
    pub fn lossy_network() -> Self {
        Self {
            timeout_interval: Duration::from_millis(1000),
            max_retries: 20,
            ..Self::default()
        }
    }

    /// 저지연 LAN용 설정 (짧은 타임아웃, 큰 윈도우)
    pub fn fast_lan() -> Self {
        Self {
            window_size: 8,
            timeout_interval: Duration::from_millis(100),
            timer_interval: Duration::from_millis(20),
            ..Self::default()
        }
    }
}
