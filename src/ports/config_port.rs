//! Configuration access port trait.

/// Typed getters return `Ok(None)` for an absent or blank key and `Err`
/// with a reason when the value is present but does not parse.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str) -> Result<Option<i64>, String>;
    fn get_double(&self, section: &str, key: &str) -> Result<Option<f64>, String>;
    fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>, String>;

    /// A list of window sizes, written either as a half-open range `a..b`
    /// or as comma-separated values. `Ok(None)` when the key is absent.
    fn get_usize_list(&self, section: &str, key: &str) -> Result<Option<Vec<usize>>, String> {
        match self.get_string(section, key) {
            None => Ok(None),
            Some(raw) => parse_usize_list(&raw).map(Some),
        }
    }
}

pub fn parse_usize_list(raw: &str) -> Result<Vec<usize>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    if let Some((start, end)) = raw.split_once("..") {
        let start = parse_one(start)?;
        let end = parse_one(end)?;
        if start >= end {
            return Err(format!("empty range '{}'", raw));
        }
        return Ok((start..end).collect());
    }

    raw.split(',').map(parse_one).collect()
}

fn parse_one(s: &str) -> Result<usize, String> {
    let s = s.trim();
    s.parse::<usize>()
        .map_err(|_| format!("'{}' is not a non-negative integer", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_half_open_range() {
        assert_eq!(parse_usize_list("5..9").unwrap(), vec![5, 6, 7, 8]);
        assert_eq!(parse_usize_list(" 5 .. 7 ").unwrap(), vec![5, 6]);
    }

    #[test]
    fn parses_comma_list() {
        assert_eq!(parse_usize_list("3, 5,8").unwrap(), vec![3, 5, 8]);
        assert_eq!(parse_usize_list("13").unwrap(), vec![13]);
    }

    #[test]
    fn blank_is_empty_list() {
        assert!(parse_usize_list("  ").unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_usize_list("9..5").is_err());
        assert!(parse_usize_list("a,b").is_err());
        assert!(parse_usize_list("1,,2").is_err());
        assert!(parse_usize_list("-3").is_err());
    }
}
