//! 수신측 조립
//!
//! - 순서대로 도착한 DATA는 즉시 내보내고 expected_seq 전진
//! - 앞질러 온 패킷은 버퍼에 보관했다가 구멍이 메워지면 한꺼번에 배출
//! - 매 수신마다 누적 ACK 생성 (중복 수신도 ACK 재송신 - ACK 유실 복구)
//!
//! 송신측 슬라이딩 윈도우의 대칭 상대. 프로토콜 자체는 재정렬을
//! 보장하지 않으므로 순서 복원은 전적으로 여기서 한다.

use std::collections::BTreeMap;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::packet::Packet;

/// 수신 조립기. 전송 하나당 하나씩 만든다.
#[derive(Debug, Default)]
pub struct Receiver {
    /// 다음에 기다리는 순서 번호
    expected_seq: u32,

    /// 앞질러 도착한 패킷 버퍼 (순서 번호 -> 페이로드)
    out_of_order: BTreeMap<u32, Bytes>,

    /// FIN의 순서 번호 (수신했다면)
    fin_seq: Option<u32>,

    /// FIN까지 순서대로 전부 배출했는지
    complete: bool,

    /// 수신 DATA/FIN 패킷 수 (중복 제외)
    pub packets_received: u64,

    /// 중복 수신 수
    pub duplicates: u64,
}

impl Receiver {
    /// 새 조립기 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// DATA 또는 FIN 패킷 하나를 받아들인다.
    ///
    /// 새로 순서가 맞춰진 페이로드들을 도착 순서대로 돌려준다
    /// (빈 FIN 페이로드는 제외). 중복이나 버퍼링만 된 경우 빈 Vec.
    pub fn accept(&mut self, packet: &Packet) -> Vec<Bytes> {
        let seq = packet.seq_num;

        // 이미 지나간 번호 - ACK가 유실됐을 가능성이 높다
        if seq < self.expected_seq || self.out_of_order.contains_key(&seq) {
            self.duplicates += 1;
            debug!("중복 수신: seq={} (expected={})", seq, self.expected_seq);
            return Vec::new();
        }

        if packet.is_fin() {
            self.fin_seq = Some(seq);
        }

        if seq > self.expected_seq {
            // 구멍이 있다 - 메워질 때까지 보관
            debug!("순서 어긋남: seq={} 버퍼링 (expected={})", seq, self.expected_seq);
            self.out_of_order.insert(seq, packet.payload.clone());
            self.packets_received += 1;
            return Vec::new();
        }

        // 정순 도착: 이어지는 버퍼까지 한꺼번에 배출
        let mut ready = Vec::new();
        self.packets_received += 1;
        if !packet.payload.is_empty() {
            ready.push(packet.payload.clone());
        }
        self.expected_seq += 1;

        while let Some(payload) = self.out_of_order.remove(&self.expected_seq) {
            if !payload.is_empty() {
                ready.push(payload);
            }
            self.expected_seq += 1;
        }

        if let Some(fin_seq) = self.fin_seq {
            if self.expected_seq > fin_seq {
                self.complete = true;
                debug!("전송 완료: FIN(seq={})까지 전부 수신", fin_seq);
            }
        }

        ready
    }

    /// 현재 누적 ACK 패킷.
    ///
    /// 아직 아무것도 순서대로 받지 못했으면 None (ack_num=0은
    /// "0번 수신"을 뜻하므로 보내면 안 된다).
    pub fn cumulative_ack(&self) -> Option<Packet> {
        if self.expected_seq == 0 {
            return None;
        }
        Some(Packet::ack(self.expected_seq - 1))
    }

    /// FIN까지 순서대로 전부 수신했는지
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// FIN 이후에 도착한 잔여 버퍼가 있으면 경고를 남긴다.
    /// (정상 전송에서는 비어 있어야 한다)
    pub fn warn_if_leftover(&self) {
        if !self.out_of_order.is_empty() {
            warn!(
                "완료 후 잔여 버퍼 {}개: 순서 번호 {:?}",
                self.out_of_order.len(),
                self.out_of_order.keys().collect::<Vec<_>>()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{FLAG_DATA, FLAG_FIN};

    fn data(seq: u32, body: &'static [u8]) -> Packet {
        Packet::new(seq, 0, FLAG_DATA, Bytes::from_static(body))
    }

    fn fin(seq: u32) -> Packet {
        Packet::new(seq, 0, FLAG_FIN, Bytes::new())
    }

    #[test]
    fn test_in_order_delivery() {
        let mut rx = Receiver::new();

        assert_eq!(rx.accept(&data(0, b"aa")), vec![Bytes::from_static(b"aa")]);
        assert_eq!(rx.accept(&data(1, b"bb")), vec![Bytes::from_static(b"bb")]);
        assert_eq!(rx.cumulative_ack().unwrap().ack_num, 1);
        assert!(!rx.is_complete());
    }

    #[test]
    fn test_no_ack_before_first_packet() {
        let rx = Receiver::new();
        assert!(rx.cumulative_ack().is_none());
    }

    #[test]
    fn test_out_of_order_buffered_then_drained() {
        let mut rx = Receiver::new();

        // 1, 2가 먼저 도착 - 배출 없음, ACK도 아직 없음
        assert!(rx.accept(&data(1, b"bb")).is_empty());
        assert!(rx.accept(&data(2, b"cc")).is_empty());
        assert!(rx.cumulative_ack().is_none());

        // 0이 오면 셋 다 순서대로 배출
        let ready = rx.accept(&data(0, b"aa"));
        assert_eq!(
            ready,
            vec![
                Bytes::from_static(b"aa"),
                Bytes::from_static(b"bb"),
                Bytes::from_static(b"cc"),
            ]
        );
        assert_eq!(rx.cumulative_ack().unwrap().ack_num, 2);
    }

    #[test]
    fn test_duplicates_counted_and_ignored() {
        let mut rx = Receiver::new();

        rx.accept(&data(0, b"aa"));
        assert!(rx.accept(&data(0, b"aa")).is_empty());
        assert_eq!(rx.duplicates, 1);
        assert_eq!(rx.packets_received, 1);

        // 중복이어도 누적 ACK는 여전히 유효
        assert_eq!(rx.cumulative_ack().unwrap().ack_num, 0);
    }

    #[test]
    fn test_fin_completes_only_in_order() {
        let mut rx = Receiver::new();

        // FIN(2)이 먼저 도착해도 완료 아님
        assert!(rx.accept(&fin(2)).is_empty());
        assert!(!rx.is_complete());

        rx.accept(&data(0, b"aa"));
        assert!(!rx.is_complete());

        // 1이 도착하면 FIN(2, 빈 페이로드)까지 배출되어 완료
        let ready = rx.accept(&data(1, b"bb"));
        assert_eq!(ready, vec![Bytes::from_static(b"bb")]);
        assert!(rx.is_complete());
        assert_eq!(rx.cumulative_ack().unwrap().ack_num, 2);
    }
}
