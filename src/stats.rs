//! 전송 통계와 결과 보고

use std::fs;
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};

/// 전송 한 건의 통계
#[derive(Debug, Clone)]
pub struct TransferStats {
    /// 전송한 파일 이름
    pub file_name: String,

    /// 파일 크기 (바이트)
    pub file_size: u64,

    /// 전송 시작 시각
    pub start_time: Instant,

    /// 소요 시간 (finish 호출 시 고정)
    pub elapsed: Option<Duration>,

    /// 첫 전송 패킷 수
    pub packets_sent: u64,

    /// 수신 패킷 수 (서버 기준 ACK 수)
    pub packets_received: u64,

    /// 재전송 수
    pub retransmissions: u64,
}

impl TransferStats {
    pub fn new() -> Self {
        Self {
            file_name: String::new(),
            file_size: 0,
            start_time: Instant::now(),
            elapsed: None,
            packets_sent: 0,
            packets_received: 0,
            retransmissions: 0,
        }
    }

    /// 전송 종료 - 소요 시간 고정
    pub fn finish(&mut self) {
        self.elapsed = Some(self.start_time.elapsed());
    }

    /// 소요 시간 (진행 중이면 현재까지)
    pub fn elapsed(&self) -> Duration {
        self.elapsed.unwrap_or_else(|| self.start_time.elapsed())
    }

    /// 처리율 (bytes/sec)
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.file_size as f64 / secs
    }

    /// 재전송 비율
    pub fn retransmission_rate(&self) -> f64 {
        let total = self.packets_sent + self.retransmissions;
        if total == 0 {
            return 0.0;
        }
        self.retransmissions as f64 / total as f64
    }

    /// 통계 요약 문자열
    pub fn summary(&self) -> String {
        format!(
            "File: {} ({} bytes) | Elapsed: {:.2}s | Sent: {} | Retransmitted: {} ({:.1}%) | Throughput: {:.2} KB/s",
            self.file_name,
            self.file_size,
            self.elapsed().as_secs_f64(),
            self.packets_sent,
            self.retransmissions,
            self.retransmission_rate() * 100.0,
            self.throughput() / 1024.0,
        )
    }

    /// 결과 보고서를 텍스트 파일로 남긴다.
    pub fn write_report(&self, path: &Path) -> io::Result<()> {
        let report = format!(
            "SRFT Transfer Report\n\
             ====================\n\
             File:            {}\n\
             Size:            {} bytes\n\
             Elapsed:         {:.3} s\n\
             Packets sent:    {}\n\
             Packets received:{}\n\
             Retransmissions: {} ({:.1}%)\n\
             Throughput:      {:.2} KB/s\n",
            self.file_name,
            self.file_size,
            self.elapsed().as_secs_f64(),
            self.packets_sent,
            self.packets_received,
            self.retransmissions,
            self.retransmission_rate() * 100.0,
            self.throughput() / 1024.0,
        );
        fs::write(path, report)
    }
}

impl Default for TransferStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retransmission_rate() {
        let mut stats = TransferStats::new();
        stats.packets_sent = 90;
        stats.retransmissions = 10;
        assert!((stats.retransmission_rate() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_report_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");

        let mut stats = TransferStats::new();
        stats.file_name = "test.bin".into();
        stats.file_size = 2048;
        stats.packets_sent = 3;
        stats.finish();

        stats.write_report(&path).unwrap();
        let report = std::fs::read_to_string(&path).unwrap();
        assert!(report.contains("test.bin"));
        assert!(report.contains("2048 bytes"));
    }
}
