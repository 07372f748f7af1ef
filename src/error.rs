//! 에러 타입 정의

use thiserror::Error;

/// SRFT 프로토콜 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO 에러: {0}")]
    Io(#[from] std::io::Error),

    /// 체크섬 검증 실패. 손상 또는 잘린 패킷 모두 이 변형으로 취급하며
    /// 수신측은 해당 패킷을 버리고 계속 수신한다 (재전송이 복구).
    #[error("체크섬 검증 실패 - 패킷 손상")]
    Checksum,

    #[error("{layer} 헤더 잘림: {needed}바이트 필요, {got}바이트 수신")]
    Truncated {
        layer: &'static str,
        needed: usize,
        got: usize,
    },

    /// Raw 소켓 생성/바인드 실패. 일반적으로 root 권한 부족.
    #[error("raw 소켓 열기 실패 (root 권한 필요): {0}")]
    RawSocket(std::io::Error),

    #[error("유효하지 않은 요청 페이로드 (UTF-8 아님)")]
    InvalidRequest,

    #[error("파일 없음: {path}")]
    FileNotFound { path: String },

    #[error("페이로드 크기 초과: 최대 {max}바이트, 요청 {got}바이트")]
    PayloadTooLarge { max: usize, got: usize },

    #[error("연결 종료")]
    ConnectionClosed,
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, Error>;
