//! 인터넷 체크섬 (16비트 1의 보수 합)
//!
//! IP/UDP/TCP 헤더가 쓰는 것과 같은 알고리즘.
//! 앱 계층 패킷의 손상 검출에도 동일하게 사용한다.

/// 주어진 바이트열의 인터넷 체크섬을 계산한다.
///
/// 빅엔디안 16비트 워드 단위로 합산하고, 16비트를 넘는 자리올림은
/// 하위로 되돌려 더한 뒤(end-around carry), 최종 합의 1의 보수를
/// 반환한다. 홀수 길이 입력은 계산용으로만 0 바이트 하나를 덧붙인다.
///
/// 체크섬이 올바르게 들어간 데이터 전체를 다시 계산하면 0이 나온다.
pub fn calculate(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut words = data.chunks_exact(2);

    for word in &mut words {
        sum += u16::from_be_bytes([word[0], word[1]]) as u32;
    }

    // 홀수 길이: 마지막 바이트를 상위로 놓고 0으로 패딩
    if let Some(&byte) = words.remainder().first() {
        sum += (byte as u32) << 8;
    }

    // end-around carry: 오버플로 비트를 하위 16비트로 접어 넣는다
    while (sum >> 16) != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    !(sum as u16)
}

/// 체크섬이 포함된 데이터의 무결성을 검증한다.
///
/// 올바른 체크섬을 품은 데이터는 재계산 결과가 0이 된다.
pub fn verify(data: &[u8]) -> bool {
    calculate(data) == 0
}
