//! UDP 헤더 조립/파싱
//!
//! IP 헤더 바로 뒤에 오는 8바이트. UDP 체크섬은 IPv4에서 선택 사항이라
//! 0으로 고정하고, 무결성은 전적으로 앱 계층 체크섬에 맡긴다.

use bytes::{Buf, BufMut};

use crate::error::{Error, Result};

/// UDP 헤더 크기
pub const UDP_HEADER_SIZE: usize = 8;

/// 파싱된 UDP 헤더 필드 (검증 없이 그대로 디코드)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpHeader {
    /// 출발지 포트
    pub src_port: u16,

    /// 목적지 포트
    pub dst_port: u16,

    /// 길이 (헤더 + 페이로드)
    pub length: u16,

    /// 체크섬 (이 프로토콜에서는 항상 0)
    pub checksum: u16,
}

/// 8바이트 UDP 헤더를 조립한다.
pub fn build(src_port: u16, dst_port: u16, payload_length: usize) -> Vec<u8> {
    debug_assert!(
        UDP_HEADER_SIZE + payload_length <= u16::MAX as usize,
        "length가 u16 범위를 넘음: {}",
        UDP_HEADER_SIZE + payload_length
    );
    let mut buf = Vec::with_capacity(UDP_HEADER_SIZE);
    buf.put_u16(src_port);
    buf.put_u16(dst_port);
    buf.put_u16((UDP_HEADER_SIZE + payload_length) as u16);
    buf.put_u16(0); // 체크섬 미계산 (IPv4 선택 사항)
    buf
}

/// 수신 바이트열의 앞 8바이트를 UDP 헤더로 파싱한다.
///
/// 호출자는 IP 헤더를 먼저 건너뛴 슬라이스를 넘겨야 한다.
pub fn parse(data: &[u8]) -> Result<UdpHeader> {
    if data.len() < UDP_HEADER_SIZE {
        return Err(Error::Truncated {
            layer: "UDP",
            needed: UDP_HEADER_SIZE,
            got: data.len(),
        });
    }

    let mut buf = &data[..UDP_HEADER_SIZE];
    Ok(UdpHeader {
        src_port: buf.get_u16(),
        dst_port: buf.get_u16(),
        length: buf.get_u16(),
        checksum: buf.get_u16(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_parse_roundtrip() {
        for &(sp, dp, len) in &[(0u16, 0u16, 0usize), (12345, 12346, 1024), (65535, 1, 7)] {
            let header = build(sp, dp, len);
            assert_eq!(header.len(), UDP_HEADER_SIZE);

            let parsed = parse(&header).unwrap();
            assert_eq!(parsed.src_port, sp);
            assert_eq!(parsed.dst_port, dp);
            assert_eq!(parsed.length, (8 + len) as u16);
            assert_eq!(parsed.checksum, 0);
        }
    }

    #[test]
    fn test_truncated_input() {
        assert!(matches!(
            parse(&[1, 2, 3]),
            Err(Error::Truncated { layer: "UDP", .. })
        ));
    }

    #[test]
    #[should_panic(expected = "length")]
    fn test_oversized_payload_asserts() {
        build(1, 2, u16::MAX as usize);
    }
}
