//! 解析器配置.

use serde::{Deserialize, Serialize};
use tao_core::{TaoError, TaoResult};

/// 跨调用拼接缓冲区的默认上限 (8 MiB)
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 8 * 1024 * 1024;

/// 解析器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// 长度前缀模式下 NAL 长度字段的字节数 (1..=4), `None` 表示 Annex B 起始码模式
    pub nal_length_size: Option<u8>,
    /// 跨调用拼接缓冲区上限, 超出时按分配失败处理
    pub max_buffer_size: usize,
    /// 跳过位长度为 0 的非法 OBU (时间分隔符与填充除外)
    pub skip_invalid_obus: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            nal_length_size: None,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            skip_invalid_obus: true,
        }
    }
}

impl ParserOptions {
    /// 校验配置取值
    pub fn validate(&self) -> TaoResult<()> {
        if let Some(n) = self.nal_length_size {
            if !(1..=4).contains(&n) {
                return Err(TaoError::InvalidArgument(format!(
                    "nal_length_size={} 超出 1..=4",
                    n
                )));
            }
        }
        if self.max_buffer_size == 0 {
            return Err(TaoError::InvalidArgument(
                "max_buffer_size 不能为 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let opts = ParserOptions::default();
        assert!(opts.validate().is_ok());
        assert_eq!(opts.nal_length_size, None);
        assert!(opts.skip_invalid_obus);
    }

    #[test]
    fn test_reject_bad_length_size() {
        let opts = ParserOptions {
            nal_length_size: Some(5),
            ..Default::default()
        };
        assert!(opts.validate().is_err());
        let opts = ParserOptions {
            nal_length_size: Some(0),
            ..Default::default()
        };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_reject_zero_buffer_limit() {
        let opts = ParserOptions {
            max_buffer_size: 0,
            ..Default::default()
        };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial_json() {
        let opts: ParserOptions = serde_json::from_str(r#"{"nal_length_size": 4}"#).unwrap();
        assert_eq!(opts.nal_length_size, Some(4));
        assert_eq!(opts.max_buffer_size, DEFAULT_MAX_BUFFER_SIZE);
    }
}
