//! 配置校验模块
//!
//! 校验规则：
//! - 字段取值范围 (validator derive)
//! - lane_width * num_lanes <= 64
//! - 每条 lane 恰好一个偏斜值，且不超过 depth - 2
//! - sink 名称非空且唯一
//!
//! 非致命问题以警告形式返回。

use std::collections::HashSet;

use contracts::{
    ContractError, PacketType, ReceiverBlueprint, SourceConfig, MAX_DATA_WIDTH,
    PACKET_TYPE_SHIFT, RAW10_GROUP_BYTES,
};
use validator::Validate;

/// 校验 ReceiverBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &ReceiverBlueprint) -> Result<(), ContractError> {
    validate_ranges(blueprint)?;
    validate_geometry(blueprint)?;
    validate_source(blueprint)?;
    validate_sinks(blueprint)?;
    Ok(())
}

/// 收集非致命警告
pub fn collect_warnings(blueprint: &ReceiverBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();
    let receiver = &blueprint.receiver;

    if receiver.image.subsample_x % RAW10_GROUP_BYTES != 0 {
        warnings.push(format!(
            "receiver.image.subsample_x = {} is not a multiple of {}: decimated samples \
             will not start on a RAW10 pixel group",
            receiver.image.subsample_x, RAW10_GROUP_BYTES
        ));
    }

    let data_width = receiver.aligner.geometry().data_width();
    if data_width < PACKET_TYPE_SHIFT + 8 {
        warnings.push(format!(
            "aligned word is {data_width} bits: the packet-type byte (bits 24..31) is absent, \
             every strobed word decodes as {:?}",
            PacketType::from_code(0)
        ));
    }

    if blueprint.sinks.is_empty() {
        warnings.push("No sinks configured - snapshots will be discarded".to_string());
    }

    if let SourceConfig::Synthetic(synthetic) = &blueprint.source {
        if synthetic.frames == 0 {
            warnings.push("source.frames = 0 - the synthetic source is empty".to_string());
        }
        if synthetic.lines > receiver.image.subsample_y.saturating_mul(receiver.image.out_height)
            || synthetic.line_words
                > receiver.image.subsample_x.saturating_mul(receiver.image.out_width)
        {
            warnings.push(
                "synthetic frame exceeds the decimated frame buffer - excess samples are suppressed"
                    .to_string(),
            );
        }
    }

    warnings
}

/// 校验字段取值范围
fn validate_ranges(blueprint: &ReceiverBlueprint) -> Result<(), ContractError> {
    blueprint
        .receiver
        .validate()
        .map_err(|e| ContractError::config_validation("receiver", e.to_string()))
}

/// 校验 lane 几何
fn validate_geometry(blueprint: &ReceiverBlueprint) -> Result<(), ContractError> {
    let aligner = &blueprint.receiver.aligner;
    let width = aligner.lane_width * aligner.num_lanes;
    if width > MAX_DATA_WIDTH {
        return Err(ContractError::config_validation(
            "receiver.aligner",
            format!(
                "lane_width * num_lanes = {width} exceeds the {MAX_DATA_WIDTH}-bit aligned word"
            ),
        ));
    }
    Ok(())
}

/// 校验样本来源
fn validate_source(blueprint: &ReceiverBlueprint) -> Result<(), ContractError> {
    let SourceConfig::Synthetic(synthetic) = &blueprint.source else {
        return Ok(());
    };
    let aligner = &blueprint.receiver.aligner;

    if !synthetic.lane_skews.is_empty() && synthetic.lane_skews.len() != aligner.num_lanes as usize
    {
        return Err(ContractError::config_validation(
            "source.lane_skews",
            format!(
                "expected one skew per lane ({}), got {}",
                aligner.num_lanes,
                synthetic.lane_skews.len()
            ),
        ));
    }

    let max_skew = aligner.max_skew();
    for (lane, skew) in synthetic.lane_skews.iter().enumerate() {
        if *skew > max_skew {
            return Err(ContractError::config_validation(
                format!("source.lane_skews[{lane}]"),
                format!(
                    "skew {skew} exceeds depth - 2 = {max_skew}; raise receiver.aligner.depth"
                ),
            ));
        }
    }
    Ok(())
}

/// 校验 sink 配置
fn validate_sinks(blueprint: &ReceiverBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
    }
    Ok(())
}
