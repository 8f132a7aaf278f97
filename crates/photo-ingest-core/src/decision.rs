use crate::error::Result;

/// Answers "should existing records be cleared before inserting?"
///
/// The pipeline asks exactly once per run, after staging succeeds, so an
/// interactive implementation never prompts for a run that already failed.
pub trait ClearDecision {
    fn should_clear(&mut self) -> Result<bool>;
}

/// Always gives the same answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDecision(pub bool);

impl ClearDecision for FixedDecision {
    fn should_clear(&mut self) -> Result<bool> {
        Ok(self.0)
    }
}

impl<F> ClearDecision for F
where
    F: FnMut() -> Result<bool>,
{
    fn should_clear(&mut self) -> Result<bool> {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_decision() {
        assert!(FixedDecision(true).should_clear().unwrap());
        assert!(!FixedDecision(false).should_clear().unwrap());
    }

    #[test]
    fn test_closure_decision() {
        let mut asked = 0;
        let mut decision = || -> Result<bool> {
            asked += 1;
            Ok(asked > 1)
        };
        assert!(!decision.should_clear().unwrap());
        assert!(decision.should_clear().unwrap());
    }
}
