//! 解析器上下文: 单个逻辑流的统一入口.
//!
//! 按 [`CodecId::split_kind`] 分派:
//! - 增量格式 (AAC / AC-3 / E-AC-3): 任意分片送入, 由 [`FrameParser`] 重组
//! - 多单元格式 (AV1 / H.264 / HEVC): 每次调用是一个完整数据包, 校验后整体输出
//! - 嵌套 box: 每次调用是一个完整数据包, 输出其负载

use log::{trace, warn};
use tao_core::{TaoError, TaoResult};

use crate::codec_id::{CodecId, SplitKind};
use crate::detectors::SyncDetector;
use crate::detectors::nested_box::parse_nested_box;
use crate::extract::{self, AccessUnit, AccessUnitList};
use crate::frame_parser::FrameParser;
use crate::options::ParserOptions;

pub use crate::frame_parser::{Outcome, ParseResult, ParserState};

#[derive(Debug)]
enum Engine {
    Incremental(FrameParser),
    Packet(ParserState),
}

/// 单个逻辑流的解析器上下文
///
/// # 示例
/// ```
/// use tao_parser::{CodecId, Outcome, ParserContext};
///
/// let mut ctx = ParserContext::new(CodecId::Aac);
/// let mut input: &[u8] = &[0x00, 0x01, 0x02];
/// while !input.is_empty() {
///     let res = ctx.parse(input);
///     if let Outcome::Unit(frame) = res.outcome {
///         println!("frame: {} bytes", frame.len());
///     }
///     input = &input[res.consumed..];
/// }
/// ```
#[derive(Debug)]
pub struct ParserContext {
    codec: CodecId,
    options: ParserOptions,
    engine: Engine,
}

impl ParserContext {
    /// 以默认配置创建
    pub fn new(codec: CodecId) -> Self {
        Self::build(codec, ParserOptions::default())
    }

    /// 以指定配置创建, 配置非法时返回 `InvalidArgument`
    pub fn with_options(codec: CodecId, options: ParserOptions) -> TaoResult<Self> {
        options.validate()?;
        Ok(Self::build(codec, options))
    }

    fn build(codec: CodecId, options: ParserOptions) -> Self {
        let engine = match SyncDetector::for_codec(codec) {
            Some(detector) => {
                Engine::Incremental(FrameParser::new(codec, detector, options.max_buffer_size))
            }
            None => Engine::Packet(ParserState::Idle),
        };
        Self {
            codec,
            options,
            engine,
        }
    }

    /// 码流格式
    pub fn codec(&self) -> CodecId {
        self.codec
    }

    /// 当前配置
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// 当前状态
    pub fn state(&self) -> ParserState {
        match &self.engine {
            Engine::Incremental(parser) => parser.state(),
            Engine::Packet(state) => *state,
        }
    }

    /// 送入一段输入
    ///
    /// 输出的单元借用上下文或 `input`, 必须在下一次调用前释放.
    pub fn parse<'a>(&'a mut self, input: &'a [u8]) -> ParseResult<'a> {
        let codec = self.codec;
        match &mut self.engine {
            Engine::Incremental(parser) => parser.parse(input),
            Engine::Packet(state) => {
                *state = ParserState::AwaitingHeader;
                if input.is_empty() {
                    return ParseResult {
                        consumed: 0,
                        outcome: Outcome::NeedMoreInput,
                    };
                }
                let outcome = match parse_packet(codec, &self.options, input) {
                    Ok(unit) => Outcome::Unit(unit),
                    Err(err) => {
                        warn!("{}: 丢弃数据包, size={}, {}", codec, input.len(), err);
                        Outcome::Dropped(err)
                    }
                };
                ParseResult {
                    consumed: input.len(),
                    outcome,
                }
            }
        }
    }

    /// 流结束, 输出遗留数据 (仅增量格式可能有)
    pub fn flush(&mut self) -> ParseResult<'_> {
        match &mut self.engine {
            Engine::Incremental(parser) => parser.flush(),
            Engine::Packet(_) => ParseResult {
                consumed: 0,
                outcome: Outcome::NeedMoreInput,
            },
        }
    }

    /// 丢弃全部状态, 回到初始状态
    pub fn reset(&mut self) {
        match &mut self.engine {
            Engine::Incremental(parser) => parser.reset(),
            Engine::Packet(state) => *state = ParserState::Idle,
        }
    }

    /// 把完整数据包切分为访问单元 (AV1 / H.264 / HEVC)
    pub fn split<'a>(&self, input: &'a [u8]) -> TaoResult<AccessUnitList<'a>> {
        split_packet(self.codec, &self.options, input)
    }

    /// 解析数据包开头的单个访问单元 (AV1 / H.264 / HEVC)
    ///
    /// NAL 格式下整个缓冲区视为一个不含起始码的 NAL.
    pub fn extract_single<'a>(&self, input: &'a [u8]) -> TaoResult<AccessUnit<'a>> {
        match self.codec {
            CodecId::Av1 => extract::extract_obu(input),
            CodecId::H264 | CodecId::H265 => extract::extract_nal(self.codec, input),
            other => Err(TaoError::Unsupported(format!(
                "{} 不支持单个访问单元提取",
                other
            ))),
        }
    }
}

fn split_packet<'a>(
    codec: CodecId,
    options: &ParserOptions,
    input: &'a [u8],
) -> TaoResult<AccessUnitList<'a>> {
    match codec {
        CodecId::Av1 => extract::split_obus(input, options.skip_invalid_obus),
        CodecId::H264 | CodecId::H265 => {
            extract::split_nals(codec, input, options.nal_length_size)
        }
        other => Err(TaoError::Unsupported(format!(
            "{} 不是多单元格式, 无法切分",
            other
        ))),
    }
}

/// 校验一个完整数据包, 返回交给解码器的字节
fn parse_packet<'a>(
    codec: CodecId,
    options: &ParserOptions,
    input: &'a [u8],
) -> TaoResult<&'a [u8]> {
    match codec.split_kind() {
        SplitKind::FixedLayout => {
            let frame = parse_nested_box(input)?;
            trace!(
                "{}: {}x{} {}, payload={}",
                codec,
                frame.width,
                frame.height,
                frame.pixel_format,
                frame.payload.len()
            );
            Ok(frame.payload)
        }
        _ => {
            let units = split_packet(codec, options, input)?;
            trace!("{}: 数据包含 {} 个单元", codec, units.len());
            Ok(input)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::adts::tests::build_adts_frame;
    use crate::detectors::av1::tests::build_obu;
    use crate::detectors::nested_box::tests::build_nested_box;

    #[test]
    fn test_state_transitions() {
        let frame = build_adts_frame(64, 0x5A);
        let mut ctx = ParserContext::new(CodecId::Aac);
        assert_eq!(ctx.state(), ParserState::Idle);

        let res = ctx.parse(&frame[..20]);
        assert!(res.unit().is_none());
        assert_eq!(ctx.state(), ParserState::AccumulatingPayload);

        let res = ctx.parse(&frame[20..]);
        assert_eq!(res.unit().unwrap(), &frame[..]);
        assert_eq!(ctx.state(), ParserState::AwaitingHeader);
    }

    #[test]
    fn test_av1_packet_validated() {
        let mut pkt = build_obu(2, None, &[]);
        pkt.extend(build_obu(6, None, &[0x10, 0x20]));
        let mut ctx = ParserContext::new(CodecId::Av1);
        let res = ctx.parse(&pkt);
        assert_eq!(res.consumed, pkt.len());
        assert_eq!(res.unit().unwrap(), &pkt[..]);

        let bad = [0x80, 0x00];
        let res = ctx.parse(&bad);
        assert_eq!(res.consumed, 2);
        assert!(res.error().unwrap().is_malformed());
    }

    #[test]
    fn test_nested_box_outcome() {
        let pkt = build_nested_box(8, 4, b"2vuy", &[1, 2, 3], false);
        let mut ctx = ParserContext::new(CodecId::NestedBox);
        let res = ctx.parse(&pkt);
        assert_eq!(res.unit().unwrap(), &[1, 2, 3]);

        let res = ctx.parse(&pkt[..10]);
        assert_eq!(res.consumed, 10);
        assert!(matches!(res.error(), Some(TaoError::Format(_))));
    }

    #[test]
    fn test_split_uses_options() {
        let mut pkt = vec![0, 0, 0, 3];
        pkt.extend_from_slice(&[0x68, 0xCE, 0x80]);
        let opts = ParserOptions {
            nal_length_size: Some(4),
            ..Default::default()
        };
        let ctx = ParserContext::with_options(CodecId::H264, opts).unwrap();
        let units = ctx.split(&pkt).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].offset, 4);

        let single = ctx.extract_single(&pkt[4..]).unwrap();
        assert_eq!(single.raw, &pkt[4..]);
    }

    #[test]
    fn test_unsupported_operations() {
        let ctx = ParserContext::new(CodecId::Aac);
        assert!(matches!(ctx.split(&[1, 2]), Err(TaoError::Unsupported(_))));
        assert!(ctx.extract_single(&[1, 2]).is_err());
        assert!(
            ParserContext::with_options(
                CodecId::Aac,
                ParserOptions {
                    max_buffer_size: 0,
                    ..Default::default()
                }
            )
            .is_err()
        );
    }
}
