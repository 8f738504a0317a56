use crate::error::{DsrError, Result};
use serde::{Deserialize, Serialize};

/// 可选的配置文件名 (工作目录下 dsr-match.toml)
pub const CONFIG_FILE: &str = "dsr-match";

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub matching: MatchingConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// 相似度兜底阈值
    pub threshold: f64,
    /// 编码命中后判定 ExactMatch 的描述相似度下限
    pub description_threshold: f64,
    /// 限定专业类别; 为空时在所有类别中查找
    pub category: Option<String>,
    /// 兜底扫描是否先按章节过滤
    pub chapter_prefilter: bool,
    /// 匹配线程数; 为空时取 CPU 核数
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            description_threshold: 0.5,
            category: None,
            chapter_prefilter: true,
            workers: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            matching: MatchingConfig::default(),
            database: DatabaseConfig {
                url: "sqlite://dsr_reference.db".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// 分层加载: 默认值 -> dsr-match.toml (可选) -> DSR_ 环境变量
    ///
    /// 环境变量以双下划线分隔层级, 如 `DSR_MATCHING__THRESHOLD=0.4`、
    /// `DSR_DATABASE__URL=sqlite://rates.db`。
    pub fn from_env() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(
                config::Environment::with_prefix("DSR")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for value in [self.matching.threshold, self.matching.description_threshold] {
            if !(0.0..=1.0).contains(&value) {
                return Err(DsrError::InvalidThreshold(value));
            }
        }
        Ok(())
    }
}
