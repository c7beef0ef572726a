//! tao-split - 码流切分工具
//!
//! 把输入文件送入解析器, 输出重组或切分得到的每个访问单元.
//! - 增量格式 (AAC / AC-3 / E-AC-3): 按 `--chunk-size` 分片送入, 模拟任意网络分片
//! - 多单元格式 (AV1 / H.264 / HEVC): 整个文件视为一个数据包切分
//! - 嵌套 box: 文件是若干首尾相接的 box 数据包

mod report;

use anyhow::{Context, Result, bail};
use bytes::{Buf, Bytes, BytesMut};
use clap::Parser;
use log::{debug, warn};
use serde::Deserialize;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;

use tao_parse::logging::{self, LoggingConfig};
use tao_parse::parser::{CodecId, Outcome, ParserContext, ParserOptions, SplitKind};

use report::SplitReport;

/// Tao 码流切分工具
#[derive(Parser, Debug)]
#[command(name = "tao-split", version, about = "纯 Rust 码流切分工具")]
struct Cli {
    /// 输入文件路径, "-" 表示标准输入
    input: String,

    /// 码流格式: h264, hevc, av1, aac, ac3, eac3, nested-box
    #[arg(short, long)]
    codec: CodecId,

    /// 增量格式每次送入解析器的字节数
    #[arg(long, default_value_t = 4096)]
    chunk_size: usize,

    /// NAL 长度前缀字节数 (1-4), 不指定时按 Annex B 处理
    #[arg(long)]
    nal_length_size: Option<u8>,

    /// JSON 配置文件, 包含 parser 与 logging 两节
    #[arg(long)]
    config: Option<PathBuf>,

    /// 日志文件目录
    #[arg(long)]
    log_dir: Option<String>,

    /// 输出 JSON 格式
    #[arg(long)]
    json: bool,

    /// 日志详细程度 (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// 配置文件结构
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    parser: ParserOptions,
    logging: Option<LoggingConfig>,
}

fn load_config(path: Option<&Path>) -> Result<FileConfig> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("读取配置文件失败, path={}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("解析配置文件失败, path={}", path.display()))
}

fn main() {
    if let Err(err) = run(Cli::parse()) {
        eprintln!("错误: {err:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if cli.chunk_size == 0 {
        bail!("--chunk-size 必须大于 0");
    }
    let config = load_config(cli.config.as_deref())?;

    // 命令行参数优先于配置文件
    let mut log_config = config.logging.unwrap_or_default();
    if cli.verbose > 0 {
        log_config.level = LoggingConfig::from_verbosity(cli.verbose).level;
    }
    if cli.log_dir.is_some() {
        log_config.directory = cli.log_dir.clone();
    }
    logging::init(&log_config)?;

    let mut options = config.parser;
    if cli.nal_length_size.is_some() {
        options.nal_length_size = cli.nal_length_size;
    }
    let mut ctx = ParserContext::with_options(cli.codec, options).context("解析器配置非法")?;

    let reader = open_input(&cli.input)?;
    let report = match cli.codec.split_kind() {
        SplitKind::Incremental => split_stream(&mut ctx, reader, cli.chunk_size)?,
        SplitKind::MultiUnit => split_packet(&ctx, reader)?,
        SplitKind::FixedLayout => split_boxes(&mut ctx, reader)?,
    };

    if cli.json {
        println!("{}", report.render_json()?);
    } else {
        print!("{}", report.render_text());
    }
    Ok(())
}

fn open_input(input: &str) -> Result<Box<dyn Read>> {
    if input == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(input).with_context(|| format!("打开输入失败, path={input}"))?;
    Ok(Box::new(file))
}

fn read_all(mut reader: impl Read) -> Result<Bytes> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).context("读取输入失败")?;
    Ok(Bytes::from(buf))
}

fn record(report: &mut SplitReport, outcome: Outcome<'_>) {
    match outcome {
        Outcome::Unit(frame) => report.push_frame(frame.len()),
        Outcome::Dropped(err) => {
            warn!("丢弃数据: {err}");
            report.dropped += 1;
        }
        Outcome::NeedMoreInput => {}
    }
}

// ============================================================
// 增量格式
// ============================================================

fn split_stream(
    ctx: &mut ParserContext,
    mut reader: impl Read,
    chunk_size: usize,
) -> Result<SplitReport> {
    let mut report = SplitReport::new(ctx.codec().name());
    let mut chunk = vec![0u8; chunk_size];
    let mut pending = BytesMut::with_capacity(chunk_size);

    loop {
        let n = reader.read(&mut chunk).context("读取输入失败")?;
        if n == 0 {
            break;
        }
        report.total_bytes += n as u64;
        pending.extend_from_slice(&chunk[..n]);

        while !pending.is_empty() {
            let res = ctx.parse(&pending);
            let consumed = res.consumed;
            let emitted = !matches!(res.outcome, Outcome::NeedMoreInput);
            record(&mut report, res.outcome);
            pending.advance(consumed);
            if consumed == 0 && !emitted {
                break;
            }
        }
    }

    let res = ctx.flush();
    record(&mut report, res.outcome);
    debug!("{}: 共 {} 帧", ctx.codec(), report.units.len());
    Ok(report)
}

// ============================================================
// 数据包格式
// ============================================================

fn split_packet(ctx: &ParserContext, reader: impl Read) -> Result<SplitReport> {
    let data = read_all(reader)?;
    let mut report = SplitReport::new(ctx.codec().name());
    report.total_bytes = data.len() as u64;

    let units = ctx
        .split(&data)
        .with_context(|| format!("{} 数据包切分失败", ctx.codec()))?;
    for unit in units.iter() {
        report.push_unit(0, unit);
    }
    Ok(report)
}

/// 按外层 box 的 size 字段逐个切出数据包
fn split_boxes(ctx: &mut ParserContext, reader: impl Read) -> Result<SplitReport> {
    let mut data = read_all(reader)?;
    let mut report = SplitReport::new(ctx.codec().name());
    report.total_bytes = data.len() as u64;

    while data.len() >= 4 {
        let declared = (&data[..4]).get_u32() as usize;
        // size 非法时把剩余数据整体交给解析器, 由其报告格式错误
        let take = if declared >= 8 && declared <= data.len() {
            declared
        } else {
            data.len()
        };
        let packet = data.split_to(take);
        let res = ctx.parse(&packet);
        record(&mut report, res.outcome);
    }
    if !data.is_empty() {
        warn!("{}: 末尾剩余 {} 字节不足一个 box", ctx.codec(), data.len());
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn adts_frame(payload_len: usize) -> Vec<u8> {
        let len = 7 + payload_len;
        let mut frame = vec![
            0xFF,
            0xF1,
            0x50,
            0x80 | ((len >> 11) & 0x03) as u8,
            ((len >> 3) & 0xFF) as u8,
            (((len & 0x07) << 5) as u8) | 0x1F,
            0xFC,
        ];
        frame.resize(len, 0x11);
        frame
    }

    fn nested_box(payload: &[u8]) -> Vec<u8> {
        let total = 36 + payload.len() as u32;
        let mut out = Vec::new();
        out.extend_from_slice(&total.to_be_bytes());
        out.extend_from_slice(b"pack");
        out.extend_from_slice(&20u32.to_be_bytes());
        out.extend_from_slice(b"sinf");
        out.extend_from_slice(&16u32.to_be_bytes());
        out.extend_from_slice(&8u32.to_be_bytes());
        out.extend_from_slice(b"2vuy");
        out.extend_from_slice(&(8 + payload.len() as u32).to_be_bytes());
        out.extend_from_slice(b"sdat");
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn test_split_stream_small_chunks() {
        let mut stream = Vec::new();
        for n in [40, 90, 25] {
            stream.extend(adts_frame(n));
        }
        let mut ctx = ParserContext::new(CodecId::Aac);
        let report = split_stream(&mut ctx, io::Cursor::new(stream.clone()), 13).unwrap();
        let sizes: Vec<usize> = report.units.iter().map(|u| u.size).collect();
        assert_eq!(sizes, vec![47, 97, 32]);
        assert_eq!(report.total_bytes, stream.len() as u64);
        assert_eq!(report.dropped, 0);
    }

    #[test]
    fn test_split_packet_annex_b() {
        let data = [
            0x00, 0x00, 0x00, 0x01, 0x67, 0x42, 0x00, 0x1E, 0xAB, 0x80, 0x00, 0x00, 0x01, 0x68,
            0xCE, 0x80,
        ];
        let ctx = ParserContext::new(CodecId::H264);
        let report = split_packet(&ctx, &data[..]).unwrap();
        assert_eq!(report.units.len(), 2);
        assert_eq!(report.units[0].offset, Some(4));
        assert_eq!(report.units[1].unit_type.as_deref(), Some("PPS"));

        assert!(split_packet(&ctx, &[0x67, 0x42][..]).is_err());
    }

    #[test]
    fn test_split_boxes_sequence() {
        let mut data = nested_box(&[1, 2, 3]);
        data.extend(nested_box(&[4; 10]));
        data.extend_from_slice(&[0, 0]);
        let mut ctx = ParserContext::new(CodecId::NestedBox);
        let report = split_boxes(&mut ctx, &data[..]).unwrap();
        let sizes: Vec<usize> = report.units.iter().map(|u| u.size).collect();
        assert_eq!(sizes, vec![3, 10]);
        assert_eq!(report.dropped, 0);
    }

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"parser": {{"nal_length_size": 4}}, "logging": {{"level": "warn"}}}}"#
        )
        .unwrap();
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.parser.nal_length_size, Some(4));
        assert_eq!(config.logging.unwrap().level, "warn");

        let config = load_config(None).unwrap();
        assert!(config.logging.is_none());
        assert!(config.parser.nal_length_size.is_none());
    }
}
