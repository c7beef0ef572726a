//! 切分结果汇总与输出.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write;

use tao_parse::parser::AccessUnit;

/// 单个输出单元
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitInfo {
    pub index: usize,
    /// 在数据包内的偏移 (仅数据包切分模式)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporal_id: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spatial_id: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bit_length: Option<usize>,
}

/// 整个输入的切分结果
#[derive(Debug, Serialize)]
pub struct SplitReport {
    pub codec: String,
    pub total_bytes: u64,
    pub dropped: usize,
    pub units: Vec<UnitInfo>,
}

impl SplitReport {
    pub fn new(codec: &str) -> Self {
        Self {
            codec: codec.to_string(),
            total_bytes: 0,
            dropped: 0,
            units: Vec::new(),
        }
    }

    /// 记录一个重组出的帧
    pub fn push_frame(&mut self, size: usize) {
        self.units.push(UnitInfo {
            index: self.units.len(),
            offset: None,
            size,
            unit_type: None,
            temporal_id: None,
            spatial_id: None,
            bit_length: None,
        });
    }

    /// 记录一个切分出的访问单元, `base` 为所在数据包在文件中的偏移
    pub fn push_unit(&mut self, base: usize, unit: &AccessUnit<'_>) {
        self.units.push(UnitInfo {
            index: self.units.len(),
            offset: Some(base + unit.offset),
            size: unit.raw.len(),
            unit_type: Some(unit.header.type_name()),
            temporal_id: unit.header.temporal_id(),
            spatial_id: unit.header.spatial_id(),
            bit_length: Some(unit.bit_length),
        });
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "codec={} bytes={} units={} dropped={}",
            self.codec,
            self.total_bytes,
            self.units.len(),
            self.dropped
        );
        for unit in &self.units {
            let _ = write!(out, "#{:<5} size={:<7}", unit.index, unit.size);
            if let Some(offset) = unit.offset {
                let _ = write!(out, " offset={offset}");
            }
            if let Some(name) = &unit.unit_type {
                let _ = write!(out, " type={name}");
            }
            if let Some(tid) = unit.temporal_id {
                let _ = write!(out, " tid={tid}");
            }
            if let Some(sid) = unit.spatial_id {
                let _ = write!(out, " sid={sid}");
            }
            if let Some(bits) = unit.bit_length {
                let _ = write!(out, " bits={bits}");
            }
            out.push('\n');
        }
        out
    }

    pub fn render_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("序列化切分结果失败")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SplitReport {
        let mut report = SplitReport::new("aac");
        report.total_bytes = 300;
        report.push_frame(100);
        report.push_frame(200);
        report.dropped = 1;
        report
    }

    #[test]
    fn test_render_text() {
        let text = sample().render_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "codec=aac bytes=300 units=2 dropped=1");
        assert!(lines[1].starts_with("#0"));
        assert!(lines[2].contains("size=200"));
        assert!(!text.contains("offset="));
    }

    #[test]
    fn test_render_json_skips_absent_fields() {
        let json = sample().render_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["units"][1]["index"], 1);
        assert_eq!(value["units"][1]["size"], 200);
        assert!(value["units"][0].get("unit_type").is_none());
        assert_eq!(value["dropped"], 1);
    }
}
