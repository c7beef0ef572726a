//! 码流格式标识符.
//!
//! 每种标识对应一种单元切分方式: 单单元增量格式 (音频帧),
//! 多单元自定界格式 (OBU / NAL), 或固定布局的嵌套 box 包.

use std::fmt;
use std::str::FromStr;

use tao_core::TaoError;

/// 码流格式标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CodecId {
    // ========================
    // 视频
    // ========================
    /// H.264 / AVC
    H264,
    /// H.265 / HEVC
    H265,
    /// AV1 (Alliance for Open Media)
    Av1,
    /// 嵌套 box 封装的未压缩视频帧 (pack/sinf/sdat)
    NestedBox,

    // ========================
    // 音频
    // ========================
    /// AAC (ADTS 封装)
    Aac,
    /// AC-3 (Dolby Digital)
    Ac3,
    /// E-AC-3 (Dolby Digital Plus)
    Eac3,
}

/// 单元切分方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitKind {
    /// 任意分片的连续字节流, 依靠同步头增量重组单帧
    Incremental,
    /// 完整数据包内含多个自定界单元
    MultiUnit,
    /// 完整数据包对应一个固定布局帧
    FixedLayout,
}

impl CodecId {
    /// 全部已支持的格式
    pub const ALL: [CodecId; 7] = [
        Self::H264,
        Self::H265,
        Self::Av1,
        Self::NestedBox,
        Self::Aac,
        Self::Ac3,
        Self::Eac3,
    ];

    /// 获取格式对应的切分方式
    pub const fn split_kind(&self) -> SplitKind {
        match self {
            Self::Aac | Self::Ac3 | Self::Eac3 => SplitKind::Incremental,
            Self::H264 | Self::H265 | Self::Av1 => SplitKind::MultiUnit,
            Self::NestedBox => SplitKind::FixedLayout,
        }
    }

    /// 获取格式的人类可读名称
    pub const fn name(&self) -> &'static str {
        match self {
            Self::H264 => "h264",
            Self::H265 => "hevc",
            Self::Av1 => "av1",
            Self::NestedBox => "nested-box",
            Self::Aac => "aac",
            Self::Ac3 => "ac3",
            Self::Eac3 => "eac3",
        }
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for CodecId {
    type Err = TaoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        match lower.as_str() {
            "h264" | "avc" => Ok(Self::H264),
            "h265" | "hevc" => Ok(Self::H265),
            "av1" => Ok(Self::Av1),
            "nested-box" | "nestedbox" | "box" => Ok(Self::NestedBox),
            "aac" | "adts" => Ok(Self::Aac),
            "ac3" => Ok(Self::Ac3),
            "eac3" | "ec3" => Ok(Self::Eac3),
            _ => Err(TaoError::Unsupported(format!("未知码流格式: {s}"))),
        }
    }
}
