//! # tao-core
//!
//! 码流解析框架核心库, 提供错误类型与底层读取工具.
//!
//! - [`bitreader`]: 按位读取头部字段 (含 leb128)
//! - [`cursor`]: 带边界检查的字节游标
//! - [`fourcc`]: 4 字节标签

pub mod bitreader;
pub mod cursor;
pub mod error;
pub mod fourcc;

// 重导出常用类型
pub use bitreader::BitReader;
pub use cursor::ByteCursor;
pub use error::{TaoError, TaoResult};
pub use fourcc::FourCc;
