//! # Tao Parse
//!
//! 纯 Rust 实现的码流解析框架, 对标 FFmpeg 的 libavcodec 解析器层.
//!
//! 把任意分片的字节流重组为完整的访问单元:
//! - **增量重组**: AAC (ADTS), AC-3, E-AC-3
//! - **数据包切分**: AV1 OBU, H.264 / HEVC NAL (Annex B 与长度前缀), 含去转义
//! - **固定布局**: 嵌套 box 封装的视频帧
//!
//! # 快速开始
//!
//! ```rust
//! use tao_parse::parser::{CodecId, ParserContext};
//!
//! let mut ctx = ParserContext::new(CodecId::Av1);
//! // 时间分隔符 OBU
//! let units = ctx.split(&[0x12, 0x00]).unwrap();
//! assert_eq!(units.len(), 1);
//! assert_eq!(units[0].header.type_id(), 2);
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `tao-core` | 错误类型, 位/字节读取工具 |
//! | `tao-parser` | 同步检测, 帧重组, 访问单元切分 |

/// 错误类型与读取工具
pub use tao_core as core;

/// 解析框架
pub use tao_parser as parser;

pub mod logging;

/// 获取版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
