//! # tao-parser
//!
//! 码流解析框架: 把任意分片的字节流重组为完整的访问单元, 交给解码器.
//!
//! - 增量格式 (AAC ADTS / AC-3 / E-AC-3): [`frame_parser`] 通过同步头扫描跨调用重组帧
//! - 多单元格式 (AV1 OBU / H.264 / HEVC NAL): [`extract`] 切分完整数据包
//! - 嵌套 box 帧: [`detectors::nested_box`] 按固定偏移解析
//!
//! 统一入口为 [`ParserContext`].

pub mod codec_id;
pub mod combiner;
pub mod context;
pub mod detectors;
pub mod extract;
pub mod frame_parser;
pub mod options;
pub mod sync;

pub use codec_id::{CodecId, SplitKind};
pub use context::{Outcome, ParseResult, ParserContext, ParserState};
pub use extract::{AccessUnit, AccessUnitList, Payload, Rbsp, UnitHeader};
pub use options::ParserOptions;
