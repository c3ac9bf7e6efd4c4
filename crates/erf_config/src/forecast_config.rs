// crates/erf_config/src/forecast_config.rs

//! 网格点源预测配置
//!
//! 所有字段都有默认值，JSON 中缺省的字段按默认值填充。

use crate::error::ConfigError;
use crate::param::{FocalMechKind, ParamValue};
use erf_foundation::weighted::is_normalized_sum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// 预测配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// 预测名称
    #[serde(default = "default_name")]
    pub name: String,

    /// 预测时长（年）
    #[serde(default = "default_duration")]
    pub duration_years: f64,

    /// 网格
    #[serde(default)]
    pub grid: GridConfig,

    /// 震级-频度分布
    #[serde(default)]
    pub mfd: MfdConfig,

    /// 震源机制权重
    #[serde(default = "default_mechanisms")]
    pub mechanisms: Vec<MechanismWeight>,

    /// 破裂面模型
    #[serde(default)]
    pub surfaces: SurfaceModelConfig,

    /// 距离校正（为空表示不校正）
    #[serde(default)]
    pub corrections: Vec<CorrectionConfig>,

    /// 应用距离校正的最小震级
    #[serde(default = "default_min_mag_for_correction")]
    pub min_mag_for_correction: f64,

    /// 是否以距离缓存包装网格源
    #[serde(default)]
    pub cache_grid_sources: bool,

    /// 其他可调参数
    #[serde(default)]
    pub parameters: BTreeMap<String, ParamValue>,
}

fn default_name() -> String {
    "gridded".to_string()
}
fn default_duration() -> f64 {
    1.0
}
fn default_mechanisms() -> Vec<MechanismWeight> {
    vec![MechanismWeight {
        mechanism: FocalMechKind::StrikeSlip,
        weight: 1.0,
    }]
}
fn default_min_mag_for_correction() -> f64 {
    0.0
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            duration_years: default_duration(),
            grid: GridConfig::default(),
            mfd: MfdConfig::default(),
            mechanisms: default_mechanisms(),
            surfaces: SurfaceModelConfig::default(),
            corrections: Vec::new(),
            min_mag_for_correction: default_min_mag_for_correction(),
            cache_grid_sources: false,
            parameters: BTreeMap::new(),
        }
    }
}

/// 网格配置（度）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// 最小纬度
    #[serde(default = "default_min_lat")]
    pub min_lat: f64,
    /// 最大纬度
    #[serde(default = "default_max_lat")]
    pub max_lat: f64,
    /// 最小经度
    #[serde(default = "default_min_lon")]
    pub min_lon: f64,
    /// 最大经度
    #[serde(default = "default_max_lon")]
    pub max_lon: f64,
    /// 网格间距
    #[serde(default = "default_spacing")]
    pub spacing_deg: f64,
    /// 点源深度 (km)
    #[serde(default = "default_depth")]
    pub depth_km: f64,
}

fn default_min_lat() -> f64 {
    34.0
}
fn default_max_lat() -> f64 {
    34.2
}
fn default_min_lon() -> f64 {
    -118.2
}
fn default_max_lon() -> f64 {
    -118.0
}
fn default_spacing() -> f64 {
    0.1
}
fn default_depth() -> f64 {
    5.0
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            min_lat: default_min_lat(),
            max_lat: default_max_lat(),
            min_lon: default_min_lon(),
            max_lon: default_max_lon(),
            spacing_deg: default_spacing(),
            depth_km: default_depth(),
        }
    }
}

impl GridConfig {
    /// 网格节点数（纬向, 经向），端点包含在内
    pub fn node_counts(&self) -> (usize, usize) {
        let count = |min: f64, max: f64| ((max - min) / self.spacing_deg + 1e-9).floor() as usize + 1;
        (
            count(self.min_lat, self.max_lat),
            count(self.min_lon, self.max_lon),
        )
    }

    /// 网格节点 (纬度, 经度)，纬度优先
    pub fn nodes(&self) -> Vec<(f64, f64)> {
        let (n_lat, n_lon) = self.node_counts();
        let mut nodes = Vec::with_capacity(n_lat * n_lon);
        for i in 0..n_lat {
            for j in 0..n_lon {
                nodes.push((
                    self.min_lat + i as f64 * self.spacing_deg,
                    self.min_lon + j as f64 * self.spacing_deg,
                ));
            }
        }
        nodes
    }
}

/// Gutenberg-Richter 震级-频度分布配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MfdConfig {
    /// 最小震级（首个分档中心）
    #[serde(default = "default_min_mag")]
    pub min_mag: f64,
    /// 最大震级（末个分档中心）
    #[serde(default = "default_max_mag")]
    pub max_mag: f64,
    /// 分档宽度
    #[serde(default = "default_delta_mag")]
    pub delta_mag: f64,
    /// b 值
    #[serde(default = "default_b_value")]
    pub b_value: f64,
    /// 每个节点的总年发生率
    #[serde(default = "default_total_rate")]
    pub total_rate_per_node: f64,
}

fn default_min_mag() -> f64 {
    5.05
}
fn default_max_mag() -> f64 {
    7.45
}
fn default_delta_mag() -> f64 {
    0.1
}
fn default_b_value() -> f64 {
    1.0
}
fn default_total_rate() -> f64 {
    1e-3
}

impl Default for MfdConfig {
    fn default() -> Self {
        Self {
            min_mag: default_min_mag(),
            max_mag: default_max_mag(),
            delta_mag: default_delta_mag(),
            b_value: default_b_value(),
            total_rate_per_node: default_total_rate(),
        }
    }
}

/// 机制权重
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MechanismWeight {
    /// 机制
    pub mechanism: FocalMechKind,
    /// 权重
    pub weight: f64,
}

/// 破裂面模型配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SurfaceModelConfig {
    /// 达到该震级时使用有限线面，缺省表示始终使用点面
    #[serde(default)]
    pub finite_min_mag: Option<f64>,
    /// 有限面的候选走向（度），等权
    #[serde(default)]
    pub strike_choices: Vec<f64>,
}

/// 距离校正种类
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CorrectionKind {
    /// 不校正
    None,
    /// 半破裂长度分位数校正
    Fractile {
        /// 分位数 [0, 1]
        fractile: f64,
    },
}

/// 带权距离校正配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionConfig {
    /// 校正种类
    pub kind: CorrectionKind,
    /// 权重
    pub weight: f64,
}

impl ForecastConfig {
    /// 从文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound(path.as_ref().to_path_buf())
            } else {
                ConfigError::Io(e)
            }
        })?;
        let config = Self::from_json_str(&content)?;
        log::debug!(
            "从 {} 加载预测配置 '{}'",
            path.as_ref().display(),
            config.name
        );
        Ok(config)
    }

    /// 从 JSON 字符串解析并校验
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: ForecastConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 序列化为格式化 JSON
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = self.to_json_string()?;
        std::fs::write(path, content).map_err(ConfigError::Io)?;
        Ok(())
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.duration_years.is_finite() && self.duration_years > 0.0) {
            return Err(ConfigError::invalid(
                "duration_years",
                self.duration_years,
                "预测时长必须为有限正数",
            ));
        }

        let grid = &self.grid;
        if !(grid.spacing_deg.is_finite() && grid.spacing_deg > 0.0) {
            return Err(ConfigError::invalid(
                "grid.spacing_deg",
                grid.spacing_deg,
                "网格间距必须为正",
            ));
        }
        if !(-90.0..=90.0).contains(&grid.min_lat) || !(grid.min_lat..=90.0).contains(&grid.max_lat) {
            return Err(ConfigError::invalid(
                "grid.max_lat",
                format!("[{}, {}]", grid.min_lat, grid.max_lat),
                "纬度范围无效",
            ));
        }
        if !(-360.0..=360.0).contains(&grid.min_lon)
            || !(grid.min_lon..=360.0).contains(&grid.max_lon)
        {
            return Err(ConfigError::invalid(
                "grid.max_lon",
                format!("[{}, {}]", grid.min_lon, grid.max_lon),
                "经度范围无效",
            ));
        }
        if !grid.depth_km.is_finite() || grid.depth_km < 0.0 {
            return Err(ConfigError::invalid("grid.depth_km", grid.depth_km, "深度不能为负"));
        }

        let mfd = &self.mfd;
        if !(mfd.delta_mag.is_finite() && mfd.delta_mag > 0.0) {
            return Err(ConfigError::invalid("mfd.delta_mag", mfd.delta_mag, "分档宽度必须为正"));
        }
        if !(mfd.min_mag.is_finite() && mfd.max_mag.is_finite()) || mfd.max_mag < mfd.min_mag {
            return Err(ConfigError::invalid(
                "mfd.max_mag",
                mfd.max_mag,
                "最大震级不能小于最小震级",
            ));
        }
        if !mfd.total_rate_per_node.is_finite() || mfd.total_rate_per_node < 0.0 {
            return Err(ConfigError::invalid(
                "mfd.total_rate_per_node",
                mfd.total_rate_per_node,
                "发生率必须为非负有限值",
            ));
        }

        if self.mechanisms.is_empty() {
            return Err(ConfigError::Missing("mechanisms".to_string()));
        }
        let mech_sum: f64 = self.mechanisms.iter().map(|m| m.weight).sum();
        if !is_normalized_sum(mech_sum) {
            return Err(ConfigError::invalid("mechanisms", mech_sum, "机制权重和必须为 1"));
        }

        if self.surfaces.finite_min_mag.is_some() && self.surfaces.strike_choices.is_empty() {
            return Err(ConfigError::Missing("surfaces.strike_choices".to_string()));
        }

        if !self.corrections.is_empty() {
            let corr_sum: f64 = self.corrections.iter().map(|c| c.weight).sum();
            if !is_normalized_sum(corr_sum) {
                return Err(ConfigError::invalid("corrections", corr_sum, "校正权重和必须为 1"));
            }
            for corr in &self.corrections {
                if let CorrectionKind::Fractile { fractile } = corr.kind {
                    if !(0.0..=1.0).contains(&fractile) {
                        return Err(ConfigError::invalid(
                            "corrections.fractile",
                            fractile,
                            "分位数必须在 [0, 1] 内",
                        ));
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ForecastConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.grid.node_counts(), (3, 3));
    }

    #[test]
    fn test_invalid_duration() {
        let config = ForecastConfig {
            duration_years: 0.0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duration_years"));
    }

    #[test]
    fn test_unnormalized_mechanisms() {
        let mut config = ForecastConfig::default();
        config.mechanisms.push(MechanismWeight {
            mechanism: FocalMechKind::Reverse,
            weight: 0.5,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = ForecastConfig::from_json_str(r#"{"name": "test", "duration_years": 50}"#)
            .unwrap();
        assert_eq!(config.name, "test");
        assert_eq!(config.duration_years, 50.0);
        assert_eq!(config.mfd, MfdConfig::default());
    }

    #[test]
    fn test_correction_kind_json() {
        let json = r#"{"corrections": [
            {"kind": {"type": "none"}, "weight": 0.5},
            {"kind": {"type": "fractile", "fractile": 0.5}, "weight": 0.5}
        ]}"#;
        let config = ForecastConfig::from_json_str(json).unwrap();
        assert_eq!(config.corrections.len(), 2);
        assert_eq!(
            config.corrections[1].kind,
            CorrectionKind::Fractile { fractile: 0.5 }
        );
    }
}
