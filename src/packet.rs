//! 앱 계층 패킷 정의
//!
//! UDP 페이로드 안에 들어가는 커스텀 헤더 14바이트 + 페이로드.
//! 신뢰성의 심장부: 순서 번호, 누적 ACK, 플래그, 체크섬이 여기 있다.
//!
//! 헤더 배치 (네트워크 바이트 오더):
//! seq(u32) + ack(u32) + flags(u16) + checksum(u16) + payload_len(u16)

use std::fmt;

use bytes::{Buf, BufMut, Bytes};

use crate::checksum;
use crate::error::{Error, Result};

/// 앱 헤더 크기
pub const HEADER_SIZE: usize = 14;

/// 파일 데이터 청크
pub const FLAG_DATA: u16 = 0x01;

/// 확인 응답 (ack_num 유효)
pub const FLAG_ACK: u16 = 0x02;

/// 전송 종료 (더 보낼 데이터 없음)
pub const FLAG_FIN: u16 = 0x04;

/// 파일 요청 (페이로드 = UTF-8 파일명)
pub const FLAG_REQ: u16 = 0x08;

/// 프로토콜 패킷 하나
///
/// 비트 표현상 플래그 조합이 가능하지만 실제 사용에서 패킷은
/// DATA / ACK / FIN / REQ 중 정확히 하나의 역할만 가진다.
/// 생성 후 불변이며 매 전송마다 새로 만든다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// 순서 번호 (전송 내에서 0부터, 패킷당 1씩 증가)
    pub seq_num: u32,

    /// 누적 확인 번호 ("이 번호까지 전부 수신"). ACK 패킷에서만 의미 있음.
    pub ack_num: u32,

    /// 패킷 종류 비트필드
    pub flags: u16,

    /// 실어 나르는 데이터 (파일 청크, 파일명 등)
    pub payload: Bytes,
}

impl Packet {
    /// 새 패킷 생성
    pub fn new(seq_num: u32, ack_num: u32, flags: u16, payload: Bytes) -> Self {
        Self {
            seq_num,
            ack_num,
            flags,
            payload,
        }
    }

    /// 누적 ACK 패킷 생성
    pub fn ack(ack_num: u32) -> Self {
        Self::new(0, ack_num, FLAG_ACK, Bytes::new())
    }

    /// 파일 요청 패킷 생성 (페이로드 = 파일명)
    pub fn request(filename: &str) -> Self {
        Self::new(0, 0, FLAG_REQ, Bytes::copy_from_slice(filename.as_bytes()))
    }

    /// 전송용 바이트로 직렬화한다.
    ///
    /// 체크섬 자리를 0으로 둔 헤더 + 페이로드를 먼저 만들어 체크섬을
    /// 계산한 뒤, 실제 값으로 헤더를 다시 만들어 붙인다.
    pub fn encode(&self) -> Vec<u8> {
        let payload_length = self.payload.len() as u16;

        let pack = |checksum: u16| {
            let mut buf = Vec::with_capacity(HEADER_SIZE + self.payload.len());
            buf.put_u32(self.seq_num);
            buf.put_u32(self.ack_num);
            buf.put_u16(self.flags);
            buf.put_u16(checksum);
            buf.put_u16(payload_length);
            buf.put_slice(&self.payload);
            buf
        };

        let checksum = checksum::calculate(&pack(0));
        pack(checksum)
    }

    /// 수신 바이트를 패킷으로 복원한다.
    ///
    /// 체크섬 검증이 먼저다. 손상이든 잘림이든 검증에 실패하면 모두
    /// [`Error::Checksum`]으로 취급한다 - 수신측은 이 에러를 받으면
    /// 패킷이 없었던 것처럼 버린다. `payload_len` 이후의 바이트는
    /// (raw 소켓 수신 패딩 등) 무시한다.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if !checksum::verify(data) {
            return Err(Error::Checksum);
        }

        if data.len() < HEADER_SIZE {
            return Err(Error::Checksum);
        }

        let mut buf = &data[..HEADER_SIZE];
        let seq_num = buf.get_u32();
        let ack_num = buf.get_u32();
        let flags = buf.get_u16();
        let _checksum = buf.get_u16();
        let payload_length = buf.get_u16() as usize;

        if data.len() < HEADER_SIZE + payload_length {
            return Err(Error::Checksum);
        }

        let payload = Bytes::copy_from_slice(&data[HEADER_SIZE..HEADER_SIZE + payload_length]);

        Ok(Self {
            seq_num,
            ack_num,
            flags,
            payload,
        })
    }

    /// DATA 패킷 여부
    pub fn is_data(&self) -> bool {
        self.flags & FLAG_DATA != 0
    }

    /// ACK 패킷 여부
    pub fn is_ack(&self) -> bool {
        self.flags & FLAG_ACK != 0
    }

    /// FIN 패킷 여부
    pub fn is_fin(&self) -> bool {
        self.flags & FLAG_FIN != 0
    }

    /// 파일 요청 패킷 여부
    pub fn is_request(&self) -> bool {
        self.flags & FLAG_REQ != 0
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.is_data() {
            names.push("DATA");
        }
        if self.is_ack() {
            names.push("ACK");
        }
        if self.is_fin() {
            names.push("FIN");
        }
        if self.is_request() {
            names.push("REQ");
        }
        let flags = if names.is_empty() {
            "NONE".to_string()
        } else {
            names.join("|")
        };

        write!(
            f,
            "Packet(seq={}, ack={}, flags={}, payload_len={})",
            self.seq_num,
            self.ack_num,
            flags,
            self.payload.len()
        )
    }
}
