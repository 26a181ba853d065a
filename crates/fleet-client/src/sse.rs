//! 점진적 `text/event-stream` 디코더.
//!
//! 네트워크 청크 경계는 어디든 올 수 있으므로 완성된 줄만 해석합니다.
//! 줄 끝은 `\n`, `\r\n`, 단독 `\r` 모두 허용합니다.
//! `data:` 필드만 사용하고 `event:`, `id:`, `retry:`는 무시합니다.

use tracing::warn;

/// 줄바꿈 없이 버퍼에 쌓을 수 있는 최대 바이트 수.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// SSE 디코더.
#[derive(Debug, Default)]
pub struct SseDecoder {
    /// 아직 줄 끝을 만나지 못한 바이트
    pending: Vec<u8>,
    /// 현재 이벤트의 `data:` 줄
    data_lines: Vec<String>,
    /// 너무 긴 줄의 나머지를 다음 줄 끝까지 버리는 중
    discarding: bool,
}

impl SseDecoder {
    /// 새 디코더 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// 청크를 넣고 완성된 이벤트의 data 페이로드를 반환합니다.
    ///
    /// 여러 `data:` 줄은 `\n`으로 이어 붙입니다. data가 없는 이벤트는 버립니다.
    /// 한 줄이 [`MAX_LINE_BYTES`]를 넘으면 그 줄과 진행 중이던 이벤트를 버립니다.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut consumed = 0;

        while let Some((end, next)) = self.next_line_end(consumed) {
            let line = String::from_utf8_lossy(&self.pending[consumed..end]).into_owned();
            consumed = next;

            if self.discarding {
                self.discarding = false;
                continue;
            }
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }

        self.pending.drain(..consumed);

        if self.pending.len() > MAX_LINE_BYTES {
            warn!(
                buffered = self.pending.len(),
                "SSE line exceeds limit, discarding partial event"
            );
            self.pending.clear();
            self.data_lines.clear();
            self.discarding = true;
        }

        events
    }

    /// `from` 이후 첫 줄 끝의 (줄 끝 위치, 다음 줄 시작) 쌍.
    ///
    /// 버퍼 끝의 `\r`은 뒤에 `\n`이 올 수 있으므로 다음 청크까지 보류합니다.
    fn next_line_end(&self, from: usize) -> Option<(usize, usize)> {
        let offset = self.pending[from..]
            .iter()
            .position(|b| *b == b'\n' || *b == b'\r')?;
        let end = from + offset;

        if self.pending[end] == b'\n' {
            return Some((end, end + 1));
        }
        match self.pending.get(end + 1) {
            Some(b'\n') => Some((end, end + 2)),
            Some(_) => Some((end, end + 1)),
            None => None,
        }
    }

    /// 재연결 시 남은 부분 이벤트를 버립니다.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.data_lines.clear();
        self.discarding = false;
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            if self.data_lines.is_empty() {
                return None;
            }
            let data = self.data_lines.join("\n");
            self.data_lines.clear();
            return Some(data);
        }

        // 주석
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        if field == "data" {
            self.data_lines.push(value.to_string());
        }
        None
    }
}
