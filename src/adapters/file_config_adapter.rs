//! INI file configuration adapter.

use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut config = Ini::new();
        config.load(path).map_err(std::io::Error::other)?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn reads_backtest_and_strategy_sections() {
        let content = r#"
[backtest]
symbols = TQQQ, SOXL
cooldown_days = 5

[strategy]
name = EMA pullback
entry = CROSS_ABOVE(close, EMA(10))
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("backtest", "symbols"),
            Some("TQQQ, SOXL".to_string())
        );
        assert_eq!(adapter.get_int("backtest", "cooldown_days", 0), 5);
        assert_eq!(
            adapter.get_string("strategy", "entry"),
            Some("CROSS_ABOVE(close, EMA(10))".to_string())
        );
    }

    #[test]
    fn missing_keys_and_sections() {
        let adapter = FileConfigAdapter::from_string("[backtest]\ncooldown_days = 2\n").unwrap();
        assert_eq!(adapter.get_string("backtest", "missing"), None);
        assert_eq!(adapter.get_string("report", "output"), None);
        assert_eq!(adapter.get_int("backtest", "missing", 42), 42);
        assert_eq!(adapter.get_double("strategy", "stop_loss", 1.5), 1.5);
    }

    #[test]
    fn non_numeric_values_fall_back_to_default() {
        let adapter = FileConfigAdapter::from_string(
            "[backtest]\nmax_positions = many\n[strategy]\nstop_loss = tight\n",
        )
        .unwrap();
        assert_eq!(adapter.get_int("backtest", "max_positions", 3), 3);
        assert_eq!(adapter.get_double("strategy", "stop_loss", 0.0), 0.0);
    }

    #[test]
    fn get_double_returns_value() {
        let adapter = FileConfigAdapter::from_string("[strategy]\ntake_profit = 12.5\n").unwrap();
        assert_eq!(adapter.get_double("strategy", "take_profit", 0.0), 12.5);
    }

    #[test]
    fn get_bool_accepts_common_spellings() {
        let adapter = FileConfigAdapter::from_string(
            "[backtest]\na = true\nb = yes\nc = 1\nd = off\ne = No\nf = maybe\n",
        )
        .unwrap();
        assert!(adapter.get_bool("backtest", "a", false));
        assert!(adapter.get_bool("backtest", "b", false));
        assert!(adapter.get_bool("backtest", "c", false));
        assert!(!adapter.get_bool("backtest", "d", true));
        assert!(!adapter.get_bool("backtest", "e", true));
        assert!(adapter.get_bool("backtest", "f", true));
        assert!(adapter.get_bool("backtest", "use_underlying_assets", true));
    }

    #[test]
    fn from_file_reads_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[report]\noutput = trades.csv\n").unwrap();
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("report", "output"),
            Some("trades.csv".to_string())
        );
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        assert!(FileConfigAdapter::from_file("/nonexistent/path/swingtest.ini").is_err());
    }
}
