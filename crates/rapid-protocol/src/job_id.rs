//! Opaque job identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a remote job (base asset or rapid model).
///
/// The API hands out integers, but nothing here relies on that.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobId {
    Number(u64),
    Text(String),
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobId::Number(n) => write!(f, "{}", n),
            JobId::Text(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("empty job id")]
pub struct JobIdParseError;

impl FromStr for JobId {
    type Err = JobIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(JobIdParseError);
        }
        Ok(match s.parse::<u64>() {
            Ok(n) => JobId::Number(n),
            Err(_) => JobId::Text(s.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_number_and_text() {
        let n: JobId = serde_json::from_str("17").unwrap();
        assert_eq!(n, JobId::Number(17));
        let t: JobId = serde_json::from_str("\"a1b2\"").unwrap();
        assert_eq!(t, JobId::Text("a1b2".to_string()));
    }

    #[test]
    fn test_parse() {
        assert_eq!("123".parse::<JobId>().unwrap(), JobId::Number(123));
        assert_eq!(" x9 ".parse::<JobId>().unwrap(), JobId::Text("x9".to_string()));
        assert!("".parse::<JobId>().is_err());
    }
}
