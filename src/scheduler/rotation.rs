use std::fmt;

use serde::{Deserialize, Serialize};

/// Operator contact address, used for calendar attendance and reporting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Operator(pub String);

impl Operator {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Round-robin operator queue.
///
/// The operator list is never reordered; only the head index moves, so the
/// set of operators is the same after any number of rotations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperatorRotation {
    operators: Vec<Operator>,
    head: usize,
}

impl OperatorRotation {
    pub fn new(operators: Vec<Operator>) -> Self {
        Self { operators, head: 0 }
    }

    /// Take the operator at the head and move it to the tail.
    pub fn next(&mut self) -> Option<Operator> {
        let operator = self.operators.get(self.head)?.clone();
        self.head = (self.head + 1) % self.operators.len();
        Some(operator)
    }

    /// Operators in current queue order, head first.
    pub fn queue(&self) -> impl Iterator<Item = &Operator> {
        let (wrapped, head) = self.operators.split_at(self.head);
        head.iter().chain(wrapped)
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

impl FromIterator<Operator> for OperatorRotation {
    fn from_iter<I: IntoIterator<Item = Operator>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
