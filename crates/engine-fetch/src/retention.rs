//! What happens to the downloaded archive after a successful install.

use std::path::Path;
use std::str::FromStr;

use crate::Result;

/// Archive retention policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArchiveRetention {
    /// Remove the archive
    Delete,
    /// Leave the archive where it is
    Keep,
    /// Ask the operator; anything unrecognised keeps the archive
    #[default]
    Ask,
}

impl FromStr for ArchiveRetention {
    type Err = String;

    /// Parses the `--remove-download` value: `yes` deletes, `no` keeps.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" => Ok(ArchiveRetention::Delete),
            "no" | "n" => Ok(ArchiveRetention::Keep),
            other => Err(format!("expected 'yes' or 'no', got '{}'", other)),
        }
    }
}

/// Interpret an answer to "Would you like to save the archive?".
///
/// `no`/`n` deletes, `yes`/`y` keeps, and anything else keeps as well.
pub fn keep_from_answer(answer: &str) -> bool {
    !matches!(answer.trim().to_ascii_lowercase().as_str(), "no" | "n")
}

/// Source of the operator's answer for [`ArchiveRetention::Ask`]
pub trait RetentionPrompt {
    /// Return the raw answer to the keep-archive question
    fn ask_keep(&self, archive: &Path) -> Result<String>;
}

/// Prompt that always gives the same answer
#[derive(Debug, Clone)]
pub struct FixedAnswer(pub String);

impl RetentionPrompt for FixedAnswer {
    fn ask_keep(&self, _archive: &Path) -> Result<String> {
        Ok(self.0.clone())
    }
}

impl ArchiveRetention {
    /// Decide whether to keep `archive`, asking `prompt` when needed
    pub fn should_keep(&self, archive: &Path, prompt: &dyn RetentionPrompt) -> Result<bool> {
        match self {
            ArchiveRetention::Delete => Ok(false),
            ArchiveRetention::Keep => Ok(true),
            ArchiveRetention::Ask => {
                let answer = prompt.ask_keep(archive)?;
                let keep = keep_from_answer(&answer);
                if keep && !matches!(answer.trim().to_ascii_lowercase().as_str(), "yes" | "y") {
                    log::info!("Unrecognised answer '{}', keeping the archive", answer.trim());
                }
                Ok(keep)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert_eq!("yes".parse::<ArchiveRetention>(), Ok(ArchiveRetention::Delete));
        assert_eq!("No".parse::<ArchiveRetention>(), Ok(ArchiveRetention::Keep));
        assert!("maybe".parse::<ArchiveRetention>().is_err());
    }

    #[test]
    fn test_keep_from_answer() {
        assert!(keep_from_answer("yes"));
        assert!(keep_from_answer("y"));
        assert!(keep_from_answer(""));
        assert!(keep_from_answer("whatever"));
        assert!(!keep_from_answer("no"));
        assert!(!keep_from_answer(" n "));
    }

    #[test]
    fn test_should_keep() {
        let archive = Path::new("engine.zip");
        let says_no = FixedAnswer("no".to_string());
        let mumbles = FixedAnswer("hmm".to_string());

        assert!(!ArchiveRetention::Delete.should_keep(archive, &says_no).unwrap());
        assert!(ArchiveRetention::Keep.should_keep(archive, &says_no).unwrap());
        assert!(!ArchiveRetention::Ask.should_keep(archive, &says_no).unwrap());
        assert!(ArchiveRetention::Ask.should_keep(archive, &mumbles).unwrap());
    }
}
