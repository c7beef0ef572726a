//! 同步头与单元头部检测器.
//!
//! 每个检测器都是纯函数, 不保留状态:
//! - [`adts`]: AAC ADTS 帧头
//! - [`ac3`]: AC-3 / E-AC-3 同步帧头
//! - [`av1`]: AV1 OBU 头部与 leb128
//! - [`h2645`]: H.264 / HEVC 起始码与 NAL 头部
//! - [`nested_box`]: 固定布局的嵌套 box 帧

pub mod ac3;
pub mod adts;
pub mod av1;
pub mod h2645;
pub mod nested_box;

use log::trace;

use crate::codec_id::CodecId;
use ac3::{AC3_HEADER_SIZE, Ac3FrameType, parse_ac3_header};
use adts::{ADTS_HEADER_SIZE, parse_adts_header};

/// 同步头匹配结果, 驱动帧解析器的状态机
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderMatch {
    /// 帧总字节数 (含头部)
    pub frame_size: usize,
    /// 当前帧结束后是否必须重新匹配同步头
    pub need_next_header: bool,
    /// 该头部是否开始一个新的输出单元
    ///
    /// 为 false 时 (如 E-AC-3 依赖子流) 该帧并入前一个单元.
    pub new_frame_start: bool,
}

/// 单单元格式的同步检测器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDetector {
    /// AAC ADTS
    Adts,
    /// AC-3 / E-AC-3
    Ac3,
}

impl SyncDetector {
    /// 按编解码器选择检测器, 非单单元格式返回 None
    pub fn for_codec(codec: CodecId) -> Option<Self> {
        match codec {
            CodecId::Aac => Some(Self::Adts),
            CodecId::Ac3 | CodecId::Eac3 => Some(Self::Ac3),
            _ => None,
        }
    }

    /// 检测窗口字节数
    pub fn header_size(&self) -> usize {
        match self {
            Self::Adts => ADTS_HEADER_SIZE,
            Self::Ac3 => AC3_HEADER_SIZE,
        }
    }

    /// 在窗口 (最近 `header_size` 字节) 上尝试匹配同步头
    pub fn detect(&self, window: &[u8]) -> Option<HeaderMatch> {
        match self {
            Self::Adts => parse_adts_header(window).ok().map(|hdr| HeaderMatch {
                frame_size: hdr.frame_length,
                need_next_header: false,
                new_frame_start: true,
            }),
            Self::Ac3 => parse_ac3_header(window).ok().map(|hdr| {
                let new_frame_start = hdr.frame_type != Ac3FrameType::Dependent;
                if !new_frame_start {
                    trace!(
                        "E-AC-3 依赖子流, substream_id={}, size={}",
                        hdr.substream_id, hdr.frame_size
                    );
                }
                HeaderMatch {
                    frame_size: hdr.frame_size,
                    need_next_header: new_frame_start
                        || hdr.frame_type != Ac3FrameType::Ac3Convert,
                    new_frame_start,
                }
            }),
        }
    }
}
