//! 嵌套 box 帧集成测试

use tao_core::TaoError;
use tao_parser::detectors::nested_box::parse_nested_box;
use tao_parser::{CodecId, Outcome, ParserContext};

/// 构造嵌套 box 数据包, `wrapped` 时在 sdat 外包一层 cmpn
fn packet(width: u32, height: u32, payload: &[u8], wrapped: bool) -> Vec<u8> {
    let sdat_size = 8 + payload.len() as u32;
    let wrapper = if wrapped { 8 } else { 0 };
    let mut pkt = Vec::new();
    pkt.extend_from_slice(&(28 + wrapper + sdat_size).to_be_bytes());
    pkt.extend_from_slice(b"pack");
    pkt.extend_from_slice(&20u32.to_be_bytes());
    pkt.extend_from_slice(b"sinf");
    pkt.extend_from_slice(&width.to_be_bytes());
    pkt.extend_from_slice(&height.to_be_bytes());
    pkt.extend_from_slice(b"2vuy");
    if wrapped {
        pkt.extend_from_slice(&(sdat_size + 8).to_be_bytes());
        pkt.extend_from_slice(b"cmpn");
    }
    pkt.extend_from_slice(&sdat_size.to_be_bytes());
    pkt.extend_from_slice(b"sdat");
    pkt.extend_from_slice(payload);
    pkt
}

/// 数据包整体消耗, 无负载, 报告格式错误
fn assert_rejected(pkt: &[u8]) {
    let mut ctx = ParserContext::new(CodecId::NestedBox);
    let res = ctx.parse(pkt);
    assert_eq!(res.consumed, pkt.len());
    assert!(res.unit().is_none());
    assert!(
        matches!(res.outcome, Outcome::Dropped(TaoError::Format(_))),
        "len={}",
        pkt.len()
    );
}

#[test]
fn test_valid_packets() {
    let _ = env_logger::builder().is_test(true).try_init();
    let payload: Vec<u8> = (0..=255).collect();
    for wrapped in [false, true] {
        let pkt = packet(1920, 1080, &payload, wrapped);
        let frame = parse_nested_box(&pkt).unwrap();
        assert_eq!(frame.width, 1920);
        assert_eq!(frame.height, 1080);
        assert_eq!(frame.pixel_format.to_string(), "2vuy");
        assert_eq!(frame.has_component_wrapper, wrapped);

        let mut ctx = ParserContext::new(CodecId::NestedBox);
        let res = ctx.parse(&pkt);
        assert_eq!(res.consumed, pkt.len());
        assert_eq!(res.unit().unwrap(), &payload[..]);
    }
}

#[test]
fn test_short_packets_rejected() {
    let pkt = packet(16, 16, &[], false);
    assert_eq!(pkt.len(), 36);
    for len in [1, 8, 20, 35] {
        assert_rejected(&pkt[..len]);
    }
    assert!(matches!(
        parse_nested_box(&pkt[..35]),
        Err(TaoError::Format(_))
    ));
}

#[test]
fn test_fourcc_mismatch_rejected() {
    let plain = packet(16, 16, &[1, 2, 3, 4], false);
    let wrapped = packet(16, 16, &[1, 2, 3, 4], true);
    let cases = [
        (&plain, 4),    // pack
        (&plain, 12),   // sinf
        (&wrapped, 32), // cmpn
        (&plain, 32),   // sdat
        (&wrapped, 40), // 包装内的 sdat
    ];
    for (pkt, tag_offset) in cases {
        let mut bad = pkt.clone();
        bad[tag_offset] ^= 0x20;
        assert_rejected(&bad);
    }
}

#[test]
fn test_inconsistent_sizes_rejected() {
    let pkt = packet(16, 16, &[9; 12], false);

    // 外层声明长度超过数据包
    let mut bad = pkt.clone();
    bad[3] += 1;
    assert_rejected(&bad);

    // sdat 超出外层 box
    let mut bad = pkt.clone();
    bad[31] += 1;
    assert_rejected(&bad);

    // sinf 长度不是 20
    let mut bad = pkt;
    bad[11] = 24;
    assert_rejected(&bad);
}
