use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Foreign (PMA) vs domestic (PMDN) capital classification of an investment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CapitalStatus {
    #[serde(rename = "PMA")]
    Pma,
    #[serde(rename = "PMDN")]
    Pmdn,
}

impl CapitalStatus {
    pub const ALL: [CapitalStatus; 2] = [CapitalStatus::Pma, CapitalStatus::Pmdn];

    pub fn code(&self) -> &'static str {
        match self {
            CapitalStatus::Pma => "PMA",
            CapitalStatus::Pmdn => "PMDN",
        }
    }
}

impl fmt::Display for CapitalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CapitalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pma" | "foreign" | "asing" => Ok(CapitalStatus::Pma),
            "pmdn" | "domestic" | "dalam negeri" => Ok(CapitalStatus::Pmdn),
            other => Err(format!("unknown capital status {:?}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CapitalStatus;

    #[test]
    fn parses_codes_and_aliases() {
        assert_eq!("PMA".parse::<CapitalStatus>(), Ok(CapitalStatus::Pma));
        assert_eq!(" pmdn ".parse::<CapitalStatus>(), Ok(CapitalStatus::Pmdn));
        assert_eq!("Dalam Negeri".parse::<CapitalStatus>(), Ok(CapitalStatus::Pmdn));
        assert!("mixed".parse::<CapitalStatus>().is_err());
    }

    #[test]
    fn serializes_as_code() {
        assert_eq!(serde_json::to_string(&CapitalStatus::Pma).unwrap(), "\"PMA\"");
        let parsed: CapitalStatus = serde_json::from_str("\"PMDN\"").unwrap();
        assert_eq!(parsed, CapitalStatus::Pmdn);
    }
}
