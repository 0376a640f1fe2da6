//! INI file configuration adapter.

use crate::domain::error::MomtraderError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, MomtraderError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| MomtraderError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    /// Trimmed value, with blank treated as absent.
    fn value(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str) -> Result<Option<i64>, String> {
        self.value(section, key)
            .map(|raw| {
                raw.parse::<i64>()
                    .map_err(|_| format!("cannot parse '{}' as an integer", raw))
            })
            .transpose()
    }

    fn get_double(&self, section: &str, key: &str) -> Result<Option<f64>, String> {
        self.value(section, key)
            .map(|raw| {
                raw.parse::<f64>()
                    .map_err(|_| format!("cannot parse '{}' as a number", raw))
            })
            .transpose()
    }

    fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>, String> {
        self.value(section, key)
            .map(|raw| {
                Self::parse_bool(&raw)
                    .ok_or_else(|| format!("expected true or false, got '{}'", raw))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[data]
path = data/AAPL.csv

[strategy]
name = Trend reversal
kind = trend_reversal
sma_window = 26
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("data", "path"),
            Some("data/AAPL.csv".to_string())
        );
        assert_eq!(
            adapter.get_string("strategy", "name"),
            Some("Trend reversal".to_string())
        );
    }

    #[test]
    fn rule_text_survives_intact() {
        let adapter = FileConfigAdapter::from_string(
            "[strategy]\nentry = AND(ABOVE(MACD(5, 23), MACD_SIGNAL(5, 23, 13)), BELOW(RSI(13), 40))\n",
        )
        .unwrap();
        assert_eq!(
            adapter.get_string("strategy", "entry").as_deref(),
            Some("AND(ABOVE(MACD(5, 23), MACD_SIGNAL(5, 23, 13)), BELOW(RSI(13), 40))")
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[strategy]\nsma_window = 10\n").unwrap();
        assert_eq!(adapter.get_string("strategy", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_parses_or_reports() {
        let adapter = FileConfigAdapter::from_string(
            "[strategy]\nsma_window = 5\nso_window = abc\nrsi_window =\n",
        )
        .unwrap();
        assert_eq!(adapter.get_int("strategy", "sma_window"), Ok(Some(5)));
        assert!(adapter
            .get_int("strategy", "so_window")
            .unwrap_err()
            .contains("abc"));
        assert_eq!(adapter.get_int("strategy", "rsi_window"), Ok(None));
        assert_eq!(adapter.get_int("strategy", "missing"), Ok(None));
    }

    #[test]
    fn get_double_parses_or_reports() {
        let adapter = FileConfigAdapter::from_string(
            "[strategy]\ntrailing_stop = 0.05\nrsi_low = not_a_number\n",
        )
        .unwrap();
        assert_eq!(adapter.get_double("strategy", "trailing_stop"), Ok(Some(0.05)));
        assert!(adapter.get_double("strategy", "rsi_low").is_err());
        assert_eq!(adapter.get_double("strategy", "missing"), Ok(None));
    }

    #[test]
    fn get_bool_recognises_spellings() {
        let adapter = FileConfigAdapter::from_string(
            "[grid]\na = true\nb = Yes\nc = 1\nd = false\ne = no\nf = 0\ng = maybe\n",
        )
        .unwrap();
        for key in ["a", "b", "c"] {
            assert_eq!(adapter.get_bool("grid", key), Ok(Some(true)), "{key}");
        }
        for key in ["d", "e", "f"] {
            assert_eq!(adapter.get_bool("grid", key), Ok(Some(false)), "{key}");
        }
        assert!(adapter.get_bool("grid", "g").is_err());
        assert_eq!(adapter.get_bool("grid", "missing"), Ok(None));
    }

    #[test]
    fn get_usize_list_through_adapter() {
        let adapter =
            FileConfigAdapter::from_string("[grid]\nsma_window = 5..8\nso_window = 6, 9\n").unwrap();
        assert_eq!(
            adapter.get_usize_list("grid", "sma_window").unwrap(),
            Some(vec![5, 6, 7])
        );
        assert_eq!(
            adapter.get_usize_list("grid", "so_window").unwrap(),
            Some(vec![6, 9])
        );
        assert_eq!(adapter.get_usize_list("grid", "rsi_window").unwrap(), None);
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[backtest]\nclose_at_end = false\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_bool("backtest", "close_at_end"), Ok(Some(false)));
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(matches!(result, Err(MomtraderError::ConfigParse { .. })));
    }
}
