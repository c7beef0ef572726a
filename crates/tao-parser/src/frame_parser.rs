//! 单单元格式的增量帧解析器 (AAC ADTS / AC-3 / E-AC-3).
//!
//! 调用方按任意大小分块送入字节流, 每次调用最多输出一帧.
//! 帧边界由同步头扫描确定, 跨调用的半帧保存在 [`FrameCombiner`] 中.
//!
//! 每次调用的处理流程:
//! 1. 若仍欠的字节数超过本次输入, 本次没有边界
//! 2. 若仍欠字节且不需要重新匹配同步头, 边界即欠账处
//! 3. 否则从欠账处开始逐字节折入移位寄存器并尝试匹配同步头;
//!    匹配后边界为同步头起点 (可能落在遗留数据内, 即为负)
//! 4. 没有边界时全部输入进入遗留缓冲区, 否则输出拼接后的帧

use log::{debug, trace, warn};
use tao_core::TaoError;

use crate::codec_id::CodecId;
use crate::combiner::FrameCombiner;
use crate::detectors::SyncDetector;
use crate::sync::SyncState;

/// 解析器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserState {
    /// 尚未收到数据
    #[default]
    Idle,
    /// 等待同步头
    AwaitingHeader,
    /// 已匹配同步头, 仍欠负载字节
    AccumulatingPayload,
    /// 上一次调用因分配失败丢弃了数据, 下一次调用自动恢复
    Error,
}

/// 单次调用的输出
#[derive(Debug)]
pub enum Outcome<'a> {
    /// 一个完整单元
    Unit(&'a [u8]),
    /// 本次输入被丢弃 (数据损坏或分配失败), 下一次调用会重新同步
    Dropped(TaoError),
    /// 需要更多输入
    NeedMoreInput,
}

/// 单次调用的结果
///
/// 调用方必须按 `consumed` 前移输入位置, 未消耗的字节在下一次调用时重新送入.
#[derive(Debug)]
pub struct ParseResult<'a> {
    /// 本次消耗的输入字节数
    pub consumed: usize,
    /// 输出
    pub outcome: Outcome<'a>,
}

impl<'a> ParseResult<'a> {
    fn need_more(consumed: usize) -> Self {
        Self {
            consumed,
            outcome: Outcome::NeedMoreInput,
        }
    }

    /// 输出的单元 (若有)
    pub fn unit(&self) -> Option<&'a [u8]> {
        match self.outcome {
            Outcome::Unit(data) => Some(data),
            _ => None,
        }
    }

    /// 丢弃原因 (若有)
    pub fn error(&self) -> Option<&TaoError> {
        match &self.outcome {
            Outcome::Dropped(err) => Some(err),
            _ => None,
        }
    }
}

fn settled_state(sync: &SyncState) -> ParserState {
    if sync.remaining_size > 0 {
        ParserState::AccumulatingPayload
    } else {
        ParserState::AwaitingHeader
    }
}

/// 增量帧解析器
#[derive(Debug)]
pub struct FrameParser {
    codec: CodecId,
    detector: SyncDetector,
    sync: SyncState,
    combiner: FrameCombiner,
    state: ParserState,
}

impl FrameParser {
    /// 创建解析器
    pub fn new(codec: CodecId, detector: SyncDetector, max_buffer_size: usize) -> Self {
        Self {
            codec,
            detector,
            sync: SyncState::new(),
            combiner: FrameCombiner::new(max_buffer_size),
            state: ParserState::Idle,
        }
    }

    /// 当前状态
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// 当前遗留字节数
    pub fn pending(&self) -> usize {
        self.combiner.pending()
    }

    /// 送入一段输入; 空输入等同于 [`flush`](Self::flush)
    pub fn parse<'a>(&'a mut self, input: &'a [u8]) -> ParseResult<'a> {
        if input.is_empty() {
            return self.flush();
        }
        if self.state == ParserState::Error {
            debug!("{}: 从错误状态恢复, 重新同步", self.codec);
        }

        self.combiner.reclaim();
        let next = self.find_boundary(input);

        let Self {
            codec,
            sync,
            combiner,
            state,
            ..
        } = self;
        match combiner.combine(next, input) {
            Ok(Some(unit)) => {
                let consumed = next.map_or(0, |n| n.max(0) as usize);
                *state = settled_state(sync);
                trace!(
                    "{}: 输出单元 size={}, consumed={}, remaining={}",
                    codec,
                    unit.len(),
                    consumed,
                    sync.remaining_size
                );
                ParseResult {
                    consumed,
                    outcome: Outcome::Unit(unit),
                }
            }
            Ok(None) => {
                sync.consume(input.len());
                *state = settled_state(sync);
                ParseResult::need_more(input.len())
            }
            Err(err) => {
                sync.consume(input.len());
                *state = ParserState::Error;
                warn!("{}: 丢弃 {} 字节输入, {}", codec, input.len(), err);
                ParseResult {
                    consumed: input.len(),
                    outcome: Outcome::Dropped(err),
                }
            }
        }
    }

    /// 流结束: 把遗留字节作为最后一个单元输出, 并重置同步状态
    pub fn flush(&mut self) -> ParseResult<'_> {
        self.sync = SyncState::new();
        self.state = ParserState::AwaitingHeader;
        match self.combiner.combine(None, &[]) {
            Ok(Some(unit)) if !unit.is_empty() => {
                debug!("{}: flush 输出最后 {} 字节", self.codec, unit.len());
                ParseResult {
                    consumed: 0,
                    outcome: Outcome::Unit(unit),
                }
            }
            Ok(_) => ParseResult::need_more(0),
            Err(err) => ParseResult {
                consumed: 0,
                outcome: Outcome::Dropped(err),
            },
        }
    }

    /// 丢弃全部状态
    pub fn reset(&mut self) {
        self.sync = SyncState::new();
        self.combiner.reset();
        self.state = ParserState::Idle;
    }

    /// 在本次输入中查找单元边界
    ///
    /// 返回 None 表示没有边界; 负值表示下一单元的同步头始于遗留数据末尾 `-n` 字节处.
    fn find_boundary(&mut self, input: &[u8]) -> Option<isize> {
        let header_size = self.detector.header_size();
        let carry = self.combiner.pending() as isize;

        loop {
            let remaining = self.sync.remaining_size;
            if remaining > input.len() {
                return None;
            }
            if remaining > 0 && !self.sync.need_next_header {
                self.sync.remaining_size = 0;
                return Some(remaining as isize);
            }

            let mut found = None;
            for (pos, &byte) in input.iter().enumerate().skip(remaining) {
                let window = self.sync.fold_and_window(byte, header_size);
                if let Some(m) = self.detector.detect(&window[..header_size]) {
                    found = Some((pos, m));
                    break;
                }
            }
            let (pos, m) = found?;

            self.sync.register.clear();
            // 同步头起点, 可能位于本次输入之前
            let start = pos as isize - (header_size as isize - 1);
            let mut owed = m.frame_size as isize;
            self.sync.need_next_header = m.need_next_header;

            if !m.new_frame_start || carry + start <= 0 {
                // 该帧并入当前单元, 或之前没有可输出的数据
                owed += start;
                self.sync.remaining_size = owed.max(0) as usize;
                continue;
            }
            if start < 0 {
                owed += start;
            }
            self.sync.remaining_size = owed as usize;
            debug!(
                "{}: 同步头 offset={}, frame_size={}, carry={}",
                self.codec, start, m.frame_size, carry
            );
            return Some(start);
        }
    }
}
