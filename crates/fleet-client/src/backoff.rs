//! 재연결 지수 백오프.

use std::time::Duration;

/// 지수 백오프.
///
/// `delay(n) = min(base · 2^n, max)`
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base: Duration,
    max: Duration,
    attempt: u32,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30))
    }
}

impl ExponentialBackoff {
    /// 기본 지연과 상한으로 생성.
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            attempt: 0,
        }
    }

    /// n번째 시도의 지연.
    pub fn delay(&self, attempt: u32) -> Duration {
        // 2^31 이상은 어차피 상한에 걸림
        let factor = 1u32.checked_shl(attempt.min(31)).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }

    /// 다음 지연을 반환하고 시도 횟수를 증가.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.delay(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// 지금까지의 실패 횟수.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// 연결 성공 시 초기화.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
