use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reporting period of a record: a quarter (triwulan) or a semester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Period {
    Q1,
    Q2,
    Q3,
    Q4,
    S1,
    S2,
}

impl Period {
    pub fn code(&self) -> &'static str {
        match self {
            Period::Q1 => "Q1",
            Period::Q2 => "Q2",
            Period::Q3 => "Q3",
            Period::Q4 => "Q4",
            Period::S1 => "S1",
            Period::S2 => "S2",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

fn ordinal(s: &str) -> Option<u8> {
    match s.trim() {
        "1" | "i" => Some(1),
        "2" | "ii" => Some(2),
        "3" | "iii" => Some(3),
        "4" | "iv" => Some(4),
        _ => None,
    }
}

impl FromStr for Period {
    type Err = String;

    /// Accepts `Q1`, `TW 2`, `Triwulan III`, `S1`, `Semester II` and friends.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        let (quarter, rest) = if let Some(rest) = lowered.strip_prefix("triwulan") {
            (true, rest)
        } else if let Some(rest) = lowered.strip_prefix("tw") {
            (true, rest)
        } else if let Some(rest) = lowered.strip_prefix('q') {
            (true, rest)
        } else if let Some(rest) = lowered.strip_prefix("semester") {
            (false, rest)
        } else if let Some(rest) = lowered.strip_prefix('s') {
            (false, rest)
        } else {
            return Err(format!("unknown period {:?}", s));
        };

        match (quarter, ordinal(rest)) {
            (true, Some(1)) => Ok(Period::Q1),
            (true, Some(2)) => Ok(Period::Q2),
            (true, Some(3)) => Ok(Period::Q3),
            (true, Some(4)) => Ok(Period::Q4),
            (false, Some(1)) => Ok(Period::S1),
            (false, Some(2)) => Ok(Period::S2),
            _ => Err(format!("unknown period {:?}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Period;

    #[test]
    fn parses_quarter_spellings() {
        assert_eq!("Q1".parse::<Period>(), Ok(Period::Q1));
        assert_eq!("TW 2".parse::<Period>(), Ok(Period::Q2));
        assert_eq!("Triwulan III".parse::<Period>(), Ok(Period::Q3));
        assert_eq!("triwulan 4".parse::<Period>(), Ok(Period::Q4));
    }

    #[test]
    fn parses_semesters() {
        assert_eq!("S1".parse::<Period>(), Ok(Period::S1));
        assert_eq!("Semester II".parse::<Period>(), Ok(Period::S2));
    }

    #[test]
    fn rejects_out_of_range() {
        assert!("Semester III".parse::<Period>().is_err());
        assert!("Q5".parse::<Period>().is_err());
        assert!("annual".parse::<Period>().is_err());
    }
}
