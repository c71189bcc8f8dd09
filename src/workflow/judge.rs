// Turning the evaluator's free-text answer into pass/fail

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::WorkflowError;

/// What the evaluator is asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JudgeMode {
    /// "yes" / "no"
    #[default]
    Binary,
    /// Satisfaction score from 1 to 5; 4 and 5 pass
    Scale,
}

/// How strictly the evaluator's answer is read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JudgeParsing {
    /// Substring match anywhere in the response. Tolerates chatty wrappers
    /// ("Yes, this fully satisfies...") but can misfire on incidental tokens.
    #[default]
    Lenient,
    /// The response must be the single requested token; anything else is an
    /// `UnparseableJudgment` error.
    Strict,
}

impl FromStr for JudgeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "binary" => Ok(JudgeMode::Binary),
            "scale" => Ok(JudgeMode::Scale),
            other => Err(format!("unknown judge mode '{other}' (expected binary or scale)")),
        }
    }
}

impl fmt::Display for JudgeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JudgeMode::Binary => f.write_str("binary"),
            JudgeMode::Scale => f.write_str("scale"),
        }
    }
}

/// Judgment policy: the question asked plus the parse applied to the answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Judge {
    pub mode: JudgeMode,
    pub parsing: JudgeParsing,
}

impl Judge {
    pub fn new(mode: JudgeMode, parsing: JudgeParsing) -> Self {
        Self { mode, parsing }
    }

    /// The instruction block appended to the evaluation request
    pub fn instruction(&self) -> &'static str {
        match (self.mode, self.parsing) {
            (JudgeMode::Binary, JudgeParsing::Lenient) => {
                "Give a binary response of \"yes\" or \"no\" to the question: \
                 \"Does the 'Worker answer' fully satisfy the requirements of the original prompt?\""
            }
            (JudgeMode::Binary, JudgeParsing::Strict) => {
                "Does the 'Worker answer' fully satisfy the requirements of the original prompt?\n\
                 Respond with exactly one word, either yes or no, and nothing else."
            }
            (JudgeMode::Scale, JudgeParsing::Lenient) => {
                "On a scale of 1 to 5, where 1 means not at all and 5 means completely, \
                 how well does the 'Worker answer' satisfy the requirements of the original prompt?"
            }
            (JudgeMode::Scale, JudgeParsing::Strict) => {
                "On a scale of 1 to 5, where 1 means not at all and 5 means completely, \
                 how well does the 'Worker answer' satisfy the requirements of the original prompt?\n\
                 Respond with a single digit from 1 to 5 and nothing else."
            }
        }
    }

    /// Read pass/fail out of the evaluator's response
    pub fn parse(&self, response: &str) -> Result<bool, WorkflowError> {
        match self.parsing {
            JudgeParsing::Lenient => Ok(self.parse_lenient(response)),
            JudgeParsing::Strict => self.parse_strict(response),
        }
    }

    fn parse_lenient(&self, response: &str) -> bool {
        match self.mode {
            JudgeMode::Binary => response.to_lowercase().contains("yes"),
            JudgeMode::Scale => response.contains('4') || response.contains('5'),
        }
    }

    fn parse_strict(&self, response: &str) -> Result<bool, WorkflowError> {
        let token = response
            .trim()
            .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '*'))
            .trim_end_matches(['.', '!'])
            .trim()
            .to_lowercase();

        let verdict = match self.mode {
            JudgeMode::Binary => match token.as_str() {
                "yes" => Some(true),
                "no" => Some(false),
                _ => None,
            },
            JudgeMode::Scale => match token.parse::<u8>() {
                Ok(score @ 1..=5) => Some(score >= 4),
                _ => None,
            },
        };

        verdict.ok_or_else(|| WorkflowError::UnparseableJudgment {
            response: response.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lenient(mode: JudgeMode) -> Judge {
        Judge::new(mode, JudgeParsing::Lenient)
    }

    fn strict(mode: JudgeMode) -> Judge {
        Judge::new(mode, JudgeParsing::Strict)
    }

    #[test]
    fn test_lenient_binary_accepts_wrapped_yes() {
        let judge = lenient(JudgeMode::Binary);
        assert!(judge
            .parse("Yes, this fully satisfies the prompt.")
            .unwrap());
        assert!(judge.parse("YES").unwrap());
        assert!(!judge.parse("No.").unwrap());
    }

    #[test]
    fn test_lenient_binary_is_a_substring_match() {
        // Known brittleness: "yes" inside another word still passes
        let judge = lenient(JudgeMode::Binary);
        assert!(judge.parse("Eyes on the details: not quite.").unwrap());
    }

    #[test]
    fn test_lenient_scale() {
        let judge = lenient(JudgeMode::Scale);
        assert!(!judge.parse("I'd rate this a 3.").unwrap());
        assert!(judge.parse("Score: 4/5").unwrap());
        assert!(judge.parse("5").unwrap());
        assert!(!judge.parse("1 - it misses the point").unwrap());
    }

    #[test]
    fn test_strict_binary() {
        let judge = strict(JudgeMode::Binary);
        assert!(judge.parse("yes").unwrap());
        assert!(judge.parse("  \"Yes.\"\n").unwrap());
        assert!(!judge.parse("No").unwrap());
    }

    #[test]
    fn test_strict_binary_rejects_free_text() {
        let judge = strict(JudgeMode::Binary);
        let err = judge
            .parse("The answer is not satisfactory; no further comment.")
            .unwrap_err();
        assert!(matches!(err, WorkflowError::UnparseableJudgment { .. }));
    }

    #[test]
    fn test_strict_scale() {
        let judge = strict(JudgeMode::Scale);
        assert!(judge.parse("4").unwrap());
        assert!(judge.parse("5.").unwrap());
        assert!(!judge.parse("3").unwrap());
        assert!(judge.parse("option 5 looks best").is_err());
        assert!(judge.parse("7").is_err());
        assert!(judge.parse("").is_err());
    }

    #[test]
    fn test_judge_mode_from_str() {
        assert_eq!("binary".parse::<JudgeMode>(), Ok(JudgeMode::Binary));
        assert_eq!(" Scale ".parse::<JudgeMode>(), Ok(JudgeMode::Scale));
        assert!("stars".parse::<JudgeMode>().is_err());
    }

    #[test]
    fn test_instructions_differ_per_policy() {
        let binary = lenient(JudgeMode::Binary).instruction();
        assert!(binary.contains("\"yes\" or \"no\""));
        assert!(strict(JudgeMode::Scale).instruction().contains("single digit"));
    }
}
