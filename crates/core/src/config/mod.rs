use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod validation;

pub use validation::{ConfigValidator, ValidationUtils};

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub engine: EngineConfig,
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
}

/// 循环任务引擎配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub enabled: bool,
    /// 周期扫描的间隔（秒），扫描节奏是运维配置，引擎本身无状态
    pub sweep_interval_seconds: u64,
    /// 用户时区相对UTC的偏移（分钟），决定"今天"的日界
    pub timezone_offset_minutes: i32,
}

impl EngineConfig {
    pub fn fixed_offset(&self) -> FixedOffset {
        use chrono::Offset;
        // 校验保证偏移在±14小时内，超范围时退回UTC
        FixedOffset::east_opt(self.timezone_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    /// 以用户时区计算给定时刻所在的日历日
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.fixed_offset()).date_naive()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://recur.db".to_string(),
                max_connections: 10,
                min_connections: 1,
                connection_timeout_seconds: 30,
                idle_timeout_seconds: 600,
            },
            engine: EngineConfig {
                enabled: true,
                sweep_interval_seconds: 60,
                timezone_offset_minutes: 0,
            },
        }
    }
}

impl AppConfig {
    /// 加载配置：TOML文件 + RECUR__前缀的环境变量覆盖
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else {
            let default_paths = ["config/recur.toml", "recur.toml", "/etc/recur/config.toml"];

            let mut config_file_found = false;
            for path in &default_paths {
                if Path::new(path).exists() {
                    builder = builder.add_source(File::new(path, FileFormat::Toml));
                    config_file_found = true;
                    break;
                }
            }

            if !config_file_found {
                builder = builder
                    .set_default("database.url", "sqlite://recur.db")?
                    .set_default("database.max_connections", 10)?
                    .set_default("database.min_connections", 1)?
                    .set_default("database.connection_timeout_seconds", 30)?
                    .set_default("database.idle_timeout_seconds", 600)?
                    .set_default("engine.enabled", true)?
                    .set_default("engine.sweep_interval_seconds", 60)?
                    .set_default("engine.timezone_offset_minutes", 0)?;
            }
        }

        let config = builder
            .add_source(
                Environment::with_prefix("RECUR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("构建配置失败")?;

        let app_config: AppConfig = config.try_deserialize().context("解析配置失败")?;

        app_config
            .validate()
            .map_err(|e| anyhow::anyhow!("配置验证失败: {}", e))?;

        Ok(app_config)
    }
}

impl ConfigValidator for AppConfig {
    fn validate(&self) -> crate::errors::EngineResult<()> {
        self.database.validate()?;
        self.engine.validate()?;
        Ok(())
    }
}

impl ConfigValidator for DatabaseConfig {
    fn validate(&self) -> crate::errors::EngineResult<()> {
        ValidationUtils::validate_not_empty(&self.url, "database.url")?;

        let supported_scheme = self.url.starts_with("postgresql://")
            || self.url.starts_with("postgres://")
            || self.url.starts_with("sqlite:");
        if !supported_scheme {
            return Err(crate::errors::EngineError::Configuration(
                "database.url must start with postgresql://, postgres:// or sqlite:".to_string(),
            ));
        }

        ValidationUtils::validate_count(self.max_connections as usize, "database.max_connections")?;
        ValidationUtils::validate_count(self.min_connections as usize, "database.min_connections")?;

        if self.min_connections > self.max_connections {
            return Err(crate::errors::EngineError::Configuration(
                "database.min_connections must be less than or equal to max_connections"
                    .to_string(),
            ));
        }

        ValidationUtils::validate_timeout_seconds(self.connection_timeout_seconds)?;
        ValidationUtils::validate_timeout_seconds(self.idle_timeout_seconds)?;

        Ok(())
    }
}

impl ConfigValidator for EngineConfig {
    fn validate(&self) -> crate::errors::EngineResult<()> {
        ValidationUtils::validate_timeout_seconds(self.sweep_interval_seconds)?;
        ValidationUtils::validate_utc_offset_minutes(self.timezone_offset_minutes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_database_config_validation() {
        let config = DatabaseConfig {
            url: "postgresql://localhost/recur".to_string(),
            max_connections: 10,
            min_connections: 1,
            connection_timeout_seconds: 30,
            idle_timeout_seconds: 600,
        };
        assert!(config.validate().is_ok());

        let mut invalid_config = config.clone();
        invalid_config.url = "".to_string();
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = config.clone();
        invalid_config.url = "mysql://localhost/recur".to_string();
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = config.clone();
        invalid_config.min_connections = 20;
        assert!(invalid_config.validate().is_err());
    }

    #[test]
    fn test_engine_config_validation() {
        let config = EngineConfig {
            enabled: true,
            sweep_interval_seconds: 60,
            timezone_offset_minutes: 480,
        };
        assert!(config.validate().is_ok());

        let mut invalid_config = config.clone();
        invalid_config.sweep_interval_seconds = 0;
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = config.clone();
        invalid_config.timezone_offset_minutes = 15 * 60;
        assert!(invalid_config.validate().is_err());
    }

    #[test]
    fn test_local_date_crosses_day_boundary() {
        // UTC+8的用户在UTC晚上8点之后已经是第二天
        let config = EngineConfig {
            enabled: true,
            sweep_interval_seconds: 60,
            timezone_offset_minutes: 480,
        };
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 22, 0, 0).unwrap();
        assert_eq!(
            config.local_date(at),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );

        let config_utc = EngineConfig {
            enabled: true,
            sweep_interval_seconds: 60,
            timezone_offset_minutes: 0,
        };
        assert_eq!(
            config_utc.local_date(at),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
    }
}
