//! 统一错误类型定义.
//!
//! 所有解析器 crate 共用的错误类型, 支持跨模块传播.
//! 需要更多输入 (`NeedMoreData`) 不是真正的错误, 调用方应继续送入数据.

use thiserror::Error;

/// 解析框架统一错误类型
#[derive(Debug, Error)]
pub enum TaoError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 不支持的操作
    #[error("不支持的操作: {0}")]
    Unsupported(String),

    /// 同步头/单元头部非法, 或声明长度与缓冲区不一致
    #[error("头部格式错误: {0}")]
    MalformedHeader(String),

    /// 长度字段超出合理范围 (如 size * 8 溢出 i32)
    #[error("数值越界: {0}")]
    RangeOverflow(String),

    /// 固定布局封装格式错误
    #[error("格式错误: {0}")]
    Format(String),

    /// 数据不足, 需要更多输入
    #[error("数据不足, 需要更多输入")]
    NeedMoreData,

    /// 读取越过缓冲区末尾
    #[error("已到达缓冲区末尾")]
    Eof,

    /// 内存分配失败
    #[error("内存分配失败: {0}")]
    OutOfMemory(String),
}

impl TaoError {
    /// 是否属于码流损坏类错误
    ///
    /// `RangeOverflow` 与 `Eof` 在调用方看来等同于头部错误, 丢弃当前单元后继续解析即可.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::MalformedHeader(_) | Self::RangeOverflow(_) | Self::Format(_) | Self::Eof
        )
    }

    /// 是否可以在下一次调用时自动恢复
    pub fn is_recoverable(&self) -> bool {
        self.is_malformed() || matches!(self, Self::NeedMoreData | Self::OutOfMemory(_))
    }
}

/// 统一 Result 类型
pub type TaoResult<T> = Result<T, TaoError>;
