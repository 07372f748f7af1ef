//! IPv4 헤더 조립/파싱
//!
//! SOCK_RAW + IP_HDRINCL에서는 OS가 IP 헤더를 만들어 주지 않으므로
//! 20바이트 헤더(옵션 없음)를 직접 조립한다. 체크섬은 두 단계로:
//! 체크섬 필드를 0으로 두고 한 번 조립 → 계산 → 실제 값으로 재조립.

use std::net::Ipv4Addr;

use bytes::{Buf, BufMut};

use crate::checksum;
use crate::error::{Error, Result};
use crate::IP_PROTOCOL_UDP;

/// IPv4 헤더 크기 (옵션 없음)
pub const IP_HEADER_SIZE: usize = 20;

/// 파싱된 IPv4 헤더 필드
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpHeader {
    /// IP 버전 (상위 니블)
    pub version: u8,

    /// 헤더 길이 (바이트, IHL x 4)
    ///
    /// 이 프로토콜은 20바이트만 내보내지만 옵션이 붙은 헤더도
    /// 수신될 수 있으므로, 다음 계층의 시작 위치는 반드시 이 값으로
    /// 잡아야 한다 (20 하드코딩 금지).
    pub header_length: usize,

    /// Type of Service
    pub tos: u8,

    /// 전체 길이 (헤더 + 페이로드)
    pub total_length: u16,

    /// 식별자 (단편화 미사용이라 송신 시 0)
    pub identification: u16,

    /// 플래그(3비트) + 단편 오프셋(13비트)
    pub flags_fragment: u16,

    /// Time to Live
    pub ttl: u8,

    /// 프로토콜 번호 (UDP = 17)
    pub protocol: u8,

    /// 헤더 체크섬 (parse는 검증하지 않음 - 필요 시 호출자 책임)
    pub checksum: u16,

    /// 출발지 주소
    pub src_ip: Ipv4Addr,

    /// 목적지 주소
    pub dst_ip: Ipv4Addr,
}

/// 필드 값으로 20바이트를 채운다. 체크섬만 바꿔 두 번 호출된다.
fn pack(src_ip: Ipv4Addr, dst_ip: Ipv4Addr, total_length: u16, checksum: u16) -> Vec<u8> {
    let mut buf = Vec::with_capacity(IP_HEADER_SIZE);
    buf.put_u8(0x45); // 버전 4 + 헤더 길이 5워드 (옵션 없음)
    buf.put_u8(0); // TOS
    buf.put_u16(total_length);
    buf.put_u16(0); // identification (단편화 미사용)
    buf.put_u16(0x4000); // Don't Fragment, 오프셋 0
    buf.put_u8(64); // TTL
    buf.put_u8(IP_PROTOCOL_UDP);
    buf.put_u16(checksum);
    buf.put_slice(&src_ip.octets());
    buf.put_slice(&dst_ip.octets());
    buf
}

/// 20바이트 IPv4 헤더를 조립한다.
///
/// `payload_length`는 IP 헤더 이후 전체 크기 (UDP 헤더 + 데이터).
pub fn build(src_ip: Ipv4Addr, dst_ip: Ipv4Addr, payload_length: usize) -> Vec<u8> {
    debug_assert!(
        IP_HEADER_SIZE + payload_length <= u16::MAX as usize,
        "total_length가 u16 범위를 넘음: {}",
        IP_HEADER_SIZE + payload_length
    );
    let total_length = (IP_HEADER_SIZE + payload_length) as u16;

    let without_checksum = pack(src_ip, dst_ip, total_length, 0);
    let checksum = checksum::calculate(&without_checksum);

    pack(src_ip, dst_ip, total_length, checksum)
}

/// 수신 바이트열의 앞 20바이트를 IPv4 헤더로 파싱한다.
pub fn parse(data: &[u8]) -> Result<IpHeader> {
    if data.len() < IP_HEADER_SIZE {
        return Err(Error::Truncated {
            layer: "IP",
            needed: IP_HEADER_SIZE,
            got: data.len(),
        });
    }

    let mut buf = &data[..IP_HEADER_SIZE];
    let version_ihl = buf.get_u8();
    let tos = buf.get_u8();
    let total_length = buf.get_u16();
    let identification = buf.get_u16();
    let flags_fragment = buf.get_u16();
    let ttl = buf.get_u8();
    let protocol = buf.get_u8();
    let checksum = buf.get_u16();
    let src_ip = Ipv4Addr::new(buf.get_u8(), buf.get_u8(), buf.get_u8(), buf.get_u8());
    let dst_ip = Ipv4Addr::new(buf.get_u8(), buf.get_u8(), buf.get_u8(), buf.get_u8());

    Ok(IpHeader {
        version: version_ihl >> 4,
        header_length: ((version_ihl & 0x0F) as usize) * 4,
        tos,
        total_length,
        identification,
        flags_fragment,
        ttl,
        protocol,
        checksum,
        src_ip,
        dst_ip,
    })
}
