use std::fmt;
use std::ops::AddAssign;

/// Token-level accuracy tally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Accuracy {
    pub correct: usize,
    pub total: usize,
}

impl Accuracy {
    pub fn new(correct: usize, total: usize) -> Self {
        Self { correct, total }
    }

    pub fn add(&mut self, correct: usize, total: usize) {
        self.correct += correct;
        self.total += total;
    }

    /// Accuracy in percent, 0 when nothing was counted
    pub fn score(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            100.0 * self.correct as f64 / self.total as f64
        }
    }
}

impl AddAssign for Accuracy {
    fn add_assign(&mut self, other: Self) {
        self.add(other.correct, other.total);
    }
}

impl fmt::Display for Accuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}% ({}/{})", self.score(), self.correct, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy() {
        let mut acc = Accuracy::default();
        assert_eq!(acc.score(), 0.0);

        acc.add(3, 4);
        acc += Accuracy::new(1, 4);
        assert_eq!(acc, Accuracy::new(4, 8));
        assert_eq!(acc.score(), 50.0);
        assert_eq!(acc.to_string(), "50.00% (4/8)");
    }
}
