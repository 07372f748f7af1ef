//! Raw 소켓 엔드포인트와 프레임 조립
//!
//! AF_INET / SOCK_RAW / IPPROTO_UDP 소켓을 소유하고, 앱 패킷을
//! UDP 헤더 → IP 헤더 순으로 감싸 전선에 올린다. 수신 경로는 역순:
//! IP 파싱(header_length 준수) → UDP 파싱 → 앱 패킷 디코드.
//!
//! 송신자([`crate::Sender`])는 소켓을 직접 만지지 않고 이 타입이
//! 구현하는 [`PacketSink`]만 쓴다. send_to는 &self로 동작하므로
//! 메인 스레드와 타이머 스레드의 동시 호출에 안전하다.

use std::io::Read;
use std::net::{Ipv4Addr, SocketAddrV4};

use parking_lot::Mutex;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::ip::{self, IpHeader};
use crate::packet::Packet;
use crate::sender::PacketSink;
use crate::udp::{self, UdpHeader};
use crate::IP_PROTOCOL_UDP;

/// 수신 버퍼 크기 (최대 IP 데이터그램)
pub const RECV_BUFFER_SIZE: usize = 65535;

/// 앱 바이트를 UDP + IP 헤더로 감싸 완성된 프레임을 만든다.
pub fn build_frame(
    src_ip: Ipv4Addr,
    dst_ip: Ipv4Addr,
    src_port: u16,
    dst_port: u16,
    app_data: &[u8],
) -> Vec<u8> {
    let udp_header = udp::build(src_port, dst_port, app_data.len());
    let ip_header = ip::build(src_ip, dst_ip, udp_header.len() + app_data.len());

    let mut frame = Vec::with_capacity(ip_header.len() + udp_header.len() + app_data.len());
    frame.extend_from_slice(&ip_header);
    frame.extend_from_slice(&udp_header);
    frame.extend_from_slice(app_data);
    frame
}

/// 수신 프레임을 계층별로 벗긴다.
///
/// 반환되는 슬라이스는 앱 계층 바이트. IP 옵션이 붙은 헤더도
/// header_length를 따라 올바르게 건너뛴다.
pub fn parse_frame(data: &[u8]) -> Result<(IpHeader, UdpHeader, &[u8])> {
    let ip_header = ip::parse(data)?;

    let udp_start = ip_header.header_length;
    if data.len() < udp_start + udp::UDP_HEADER_SIZE {
        return Err(Error::Truncated {
            layer: "UDP",
            needed: udp_start + udp::UDP_HEADER_SIZE,
            got: data.len(),
        });
    }

    let udp_header = udp::parse(&data[udp_start..])?;
    let app_data = &data[udp_start + udp::UDP_HEADER_SIZE..];

    Ok((ip_header, udp_header, app_data))
}

/// Raw 소켓 하나를 소유하는 엔드포인트.
///
/// 서버와 클라이언트가 포트만 바꿔 같은 타입을 쓴다.
pub struct RawEndpoint {
    socket: Socket,
    local_ip: Ipv4Addr,
    local_port: u16,
    remote_port: u16,
    peer: Mutex<Option<Ipv4Addr>>,
}

impl RawEndpoint {
    /// SOCK_RAW 소켓을 만들어 바인드한다.
    ///
    /// IP_HDRINCL을 켜서 우리가 만든 IP 헤더가 그대로 나가게 하고,
    /// 수신 타임아웃을 걸어 수신 루프가 종료 플래그를 확인할 수 있게
    /// 한다. 권한 부족(root 아님)이면 [`Error::RawSocket`].
    pub fn bind(
        config: &Config,
        local_ip: Ipv4Addr,
        local_port: u16,
        remote_port: u16,
    ) -> Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::UDP))
            .map_err(Error::RawSocket)?;
        socket
            .set_header_included_v4(true)
            .map_err(Error::RawSocket)?;
        socket
            .set_read_timeout(Some(config.recv_timeout))
            .map_err(Error::RawSocket)?;
        socket
            .bind(&SockAddr::from(SocketAddrV4::new(local_ip, local_port)))
            .map_err(Error::RawSocket)?;

        debug!("raw 소켓 바인드: {}:{}", local_ip, local_port);

        Ok(Self {
            socket,
            local_ip,
            local_port,
            remote_port,
            peer: Mutex::new(None),
        })
    }

    /// 상대 주소 설정 (REQ 수신 시 서버가, 시작 시 클라이언트가 호출)
    pub fn set_peer(&self, ip: Ipv4Addr) {
        *self.peer.lock() = Some(ip);
    }

    /// 현재 상대 주소
    pub fn peer(&self) -> Option<Ipv4Addr> {
        *self.peer.lock()
    }

    /// 앱 패킷을 3계층 프레임으로 감싸 전송한다.
    pub fn send_app_packet(&self, packet: &Packet) -> Result<()> {
        let peer = self.peer().ok_or(Error::ConnectionClosed)?;

        let app_data = packet.encode();
        let frame = build_frame(
            self.local_ip,
            peer,
            self.local_port,
            self.remote_port,
            &app_data,
        );

        let dst = SockAddr::from(SocketAddrV4::new(peer, self.remote_port));
        self.socket.send_to(&frame, &dst)?;
        Ok(())
    }

    /// 프레임 하나를 수신해 앱 패킷으로 복원한다.
    ///
    /// 타임아웃, 다른 프로토콜, 다른 포트, 손상 패킷은 전부
    /// `Ok(None)` - 호출 루프는 그냥 다음 수신으로 넘어간다.
    /// 손상은 재전송이 복구하므로 에러로 올리지 않는다.
    pub fn recv_app_packet(&self, buf: &mut [u8]) -> Result<Option<(Packet, Ipv4Addr)>> {
        let len = match (&self.socket).read(buf) {
            Ok(len) => len,
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                return Ok(None)
            }
            Err(e) => return Err(e.into()),
        };

        let (ip_header, udp_header, app_data) = match parse_frame(&buf[..len]) {
            Ok(parsed) => parsed,
            Err(_) => return Ok(None), // 잘린 프레임 - 버림
        };

        if ip_header.protocol != IP_PROTOCOL_UDP {
            return Ok(None);
        }
        if udp_header.dst_port != self.local_port {
            return Ok(None);
        }

        match Packet::decode(app_data) {
            Ok(packet) => Ok(Some((packet, ip_header.src_ip))),
            Err(Error::Checksum) => {
                warn!("손상 패킷 수신 - 버림 (src={})", ip_header.src_ip);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

impl PacketSink for RawEndpoint {
    fn send_packet(&self, packet: &Packet) -> Result<()> {
        self.send_app_packet(packet)
    }
}
