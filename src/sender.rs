//! 송신측 슬라이딩 윈도우
//!
//! - 최대 window_size개 패킷 동시 in-flight
//! - 미확인 패킷마다 타이머, 만료 시 재전송
//! - 누적 ACK 수신 시 윈도우 전진
//!
//! TCP 슬라이딩 윈도우의 단순화 버전. 소켓은 직접 만지지 않고
//! 주입받은 [`PacketSink`]로만 바이트를 내보낸다.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::packet::Packet;

/// 주입되는 전송 능력.
///
/// 실제 구현은 IP/UDP 헤더를 씌워 raw 소켓으로 내보낸다
/// ([`crate::raw::RawEndpoint`]). 메인 스레드와 타이머 스레드가
/// 동시에 호출하므로 구현체는 동시 호출에 안전해야 한다.
pub trait PacketSink: Send + Sync {
    fn send_packet(&self, packet: &Packet) -> Result<()>;
}

impl<F> PacketSink for F
where
    F: Fn(&Packet) -> Result<()> + Send + Sync,
{
    fn send_packet(&self, packet: &Packet) -> Result<()> {
        self(packet)
    }
}

/// in-flight 패킷 하나의 기록
#[derive(Debug, Clone)]
struct UnackedPacket {
    /// 재전송용 원본 패킷
    packet: Packet,

    /// 마지막 전송 시각
    sent_at: Instant,

    /// 재전송 횟수
    retry_count: u32,
}

/// 윈도우 상태. 하나의 뮤텍스가 전체를 지킨다.
///
/// 불변식: in-flight 수 <= window_size. base는 handle_ack에서만
/// 전진하며 단조 비감소. 앞질러 온 ACK가 base를 next_seq_num 너머로
/// 밀 수 있으므로 두 값의 차이를 그냥 빼서 구하면 안 된다.
#[derive(Debug, Default)]
struct WindowState {
    /// 가장 작은 미확인 순서 번호 (윈도우 왼쪽 끝)
    base: u32,

    /// 다음에 부여할 순서 번호
    next_seq_num: u32,

    /// 순서 번호 -> 미확인 기록
    unacked: HashMap<u32, UnackedPacket>,

    /// 첫 전송 누계
    packets_sent: u64,

    /// 재전송 누계
    retransmissions: u64,
}

/// 슬라이딩 윈도우 송신자
///
/// send / handle_ack / 타이머 스캔 / 완료 확인 네 가지 동작이 전부
/// 같은 락을 잡는다. 그 외의 동기화 수단은 없다.
pub struct Sender {
    config: Config,
    sink: Arc<dyn PacketSink>,
    state: Arc<Mutex<WindowState>>,
    running: Arc<AtomicBool>,
    timer_thread: Mutex<Option<JoinHandle<()>>>,
}

impl Sender {
    /// 새 송신자 생성. 타임아웃 검사 스레드가 즉시 돌기 시작한다.
    /// 스레드 생성에 실패하면 IO 에러를 돌려준다.
    pub fn new(config: Config, sink: Arc<dyn PacketSink>) -> Result<Self> {
        let state = Arc::new(Mutex::new(WindowState::default()));
        let running = Arc::new(AtomicBool::new(true));

        let timer_thread = thread::Builder::new()
            .name("srft-timer".into())
            .spawn({
                let config = config.clone();
                let sink = sink.clone();
                let state = state.clone();
                let running = running.clone();
                move || timeout_checker(config, sink, state, running)
            })?;

        Ok(Self {
            config,
            sink,
            state,
            running,
            timer_thread: Mutex::new(Some(timer_thread)),
        })
    }

    /// 페이로드 하나를 패킷으로 만들어 전송한다.
    ///
    /// 윈도우가 가득 차 있으면 자리가 날 때까지 블록한다 (폴링).
    /// 자리가 나면 윈도우 검사 / 전송 / 기록 / next_seq_num 증가를
    /// 한 임계 구역 안에서 처리해 타이머·ACK 처리와의 경합을 막는다.
    pub fn send(&self, payload: Bytes, flags: u16) -> Result<()> {
        if payload.len() > self.config.max_payload_size {
            return Err(Error::PayloadTooLarge {
                max: self.config.max_payload_size,
                got: payload.len(),
            });
        }

        loop {
            {
                let mut state = self.state.lock();

                // 과거 전송의 지연 ACK가 base를 next_seq_num 너머로
                // 밀었을 수 있으므로 뺄셈 대신 포화 연산으로 비교한다
                if state.next_seq_num.saturating_sub(state.base) < self.config.window_size {
                    let seq_num = state.next_seq_num;
                    let packet = Packet::new(seq_num, 0, flags, payload);

                    self.sink.send_packet(&packet)?;

                    state.unacked.insert(
                        seq_num,
                        UnackedPacket {
                            packet,
                            sent_at: Instant::now(),
                            retry_count: 0,
                        },
                    );
                    state.next_seq_num += 1;
                    state.packets_sent += 1;

                    debug!("패킷 전송: seq={}", seq_num);
                    return Ok(());
                }
            }

            // 윈도우 가득 참 - ACK가 base를 밀어줄 때까지 대기
            thread::sleep(self.config.send_poll_interval);
        }
    }

    /// 누적 ACK 처리.
    ///
    /// ack_num 이하의 in-flight 기록을 전부 제거한다. 누적 정의상
    /// 연속성 검사는 필요 없다 - 겹치는 것만 지우면 안전하다
    /// (순서 번호는 전송 내에서 재사용되지 않음). base가 전진하는
    /// 유일한 경로.
    pub fn handle_ack(&self, ack_num: u32) {
        let mut state = self.state.lock();

        let before = state.unacked.len();
        state.unacked.retain(|&seq, _| seq > ack_num);

        if ack_num >= state.base {
            state.base = ack_num + 1;
        }

        if before != state.unacked.len() {
            debug!(
                "ACK 처리: ack={}, base={}, in-flight {} -> {}",
                ack_num,
                state.base,
                before,
                state.unacked.len()
            );
        }
    }

    /// 모든 전송 패킷이 확인되었는지
    pub fn all_acked(&self) -> bool {
        self.state.lock().unacked.is_empty()
    }

    /// 현재 in-flight 패킷 수
    pub fn in_flight(&self) -> usize {
        self.state.lock().unacked.len()
    }

    /// 현재 윈도우 base (테스트/모니터링용)
    pub fn base(&self) -> u32 {
        self.state.lock().base
    }

    /// 모든 패킷이 확인될 때까지 블록한다.
    ///
    /// 마지막 패킷을 보낸 뒤 호출. 기한 내에 다 확인되면 true,
    /// 시간 초과면 false (에러가 아니라 경고 수준의 결과).
    pub fn wait_for_completion(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.all_acked() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(self.config.completion_poll_interval);
        }
        true
    }

    /// 전송 통계: (첫 전송 수, 재전송 수)
    pub fn counters(&self) -> (u64, u64) {
        let state = self.state.lock();
        (state.packets_sent, state.retransmissions)
    }

    /// 타이머 스레드를 멈추고 합류한다.
    ///
    /// 타이머는 매 스캔 주기마다 종료 플래그를 확인하므로 join은
    /// 한 주기 안에 돌아온다.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.timer_thread.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Sender {
    fn drop(&mut self) {
        self.stop();
    }
}

/// 백그라운드 타임아웃 검사 루프.
///
/// timeout_interval보다 오래 응답이 없는 기록을 재전송한다.
/// max_retries에 도달한 기록은 그대로 둔 채 경고만 남긴다 -
/// 전송을 중단시키지 않으며, wait_for_completion의 기한이
/// 유일한 안전장치다.
fn timeout_checker(
    config: Config,
    sink: Arc<dyn PacketSink>,
    state: Arc<Mutex<WindowState>>,
    running: Arc<AtomicBool>,
) {
    while running.load(Ordering::SeqCst) {
        {
            let mut state = state.lock();
            let WindowState {
                unacked,
                retransmissions,
                ..
            } = &mut *state;

            let now = Instant::now();
            for (&seq_num, record) in unacked.iter_mut() {
                if now.duration_since(record.sent_at) <= config.timeout_interval {
                    continue;
                }

                if record.retry_count >= config.max_retries {
                    warn!(
                        "seq={} 재전송 한도 초과 ({}회) - 기록 유지, 전송 계속",
                        seq_num, config.max_retries
                    );
                    continue;
                }

                match sink.send_packet(&record.packet) {
                    Ok(()) => {
                        record.sent_at = now;
                        record.retry_count += 1;
                        *retransmissions += 1;
                        debug!("재전송: seq={}, retry={}", seq_num, record.retry_count);
                    }
                    Err(e) => {
                        warn!("재전송 실패: seq={}: {}", seq_num, e);
                    }
                }
            }
        }

        thread::sleep(config.timer_interval);
    }
}
