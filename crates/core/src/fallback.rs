//! Canned explanations used when the text model produces too little output.
//!
//! The lookup is a first-match scan over an ordered table of keyword groups.
//! A query that mentions several topics (e.g. "add" and "history") gets the
//! explanation of the group that appears first in [`TOPICS`].

/// A keyword group and the explanation returned when any keyword matches.
#[derive(Debug, Clone, Copy)]
pub struct Topic {
    pub keywords: &'static [&'static str],
    pub explanation: &'static str,
}

pub const ADDITION: &str = "Addition is a fundamental mathematical operation where we combine two or more numbers to get their sum. For example, 2 + 3 = 5. To add numbers, you line them up by place value and add each column, carrying over when the sum exceeds 9.";
pub const SUBTRACTION: &str = "Subtraction is the process of taking away one number from another. For example, 5 - 3 = 2. To subtract, you line up the numbers by place value and subtract each column, borrowing when necessary.";
pub const MULTIPLICATION: &str = "Multiplication is repeated addition. For example, 3 × 4 means adding 3 four times: 3 + 3 + 3 + 3 = 12. You can use the multiplication table or the long multiplication method for larger numbers.";
pub const DIVISION: &str = "Division is the process of sharing or grouping numbers. For example, 12 ÷ 3 = 4 means that 12 can be divided into 3 equal groups of 4. You can use long division for larger numbers.";
pub const HISTORY: &str = "History is the study of past events, particularly in human affairs. It helps us understand how societies, cultures, and civilizations have evolved over time.";
pub const SCIENCE: &str = "Science is the systematic study of the structure and behavior of the physical and natural world through observation and experiment. It includes fields like physics, chemistry, biology, and astronomy.";
pub const GEOGRAPHY: &str = "Geography is the study of places and the relationships between people and their environments. It includes physical geography (landforms, climate) and human geography (population, culture).";

/// Returned when no keyword group matches.
pub const GENERIC: &str =
    "I can help you learn about that. Could you please ask a more specific question?";

/// Keyword groups in precedence order.
pub const TOPICS: &[Topic] = &[
    Topic {
        keywords: &["addition", "add"],
        explanation: ADDITION,
    },
    Topic {
        keywords: &["subtraction", "subtract"],
        explanation: SUBTRACTION,
    },
    Topic {
        keywords: &["multiplication", "multiply"],
        explanation: MULTIPLICATION,
    },
    Topic {
        keywords: &["division", "divide"],
        explanation: DIVISION,
    },
    Topic {
        keywords: &["history"],
        explanation: HISTORY,
    },
    Topic {
        keywords: &["science"],
        explanation: SCIENCE,
    },
    Topic {
        keywords: &["geography"],
        explanation: GEOGRAPHY,
    },
];

/// Maps a free-text query to a canned explanation.
///
/// Matching is case-insensitive substring containment, so "adding" and
/// "Address" both hit the addition group. Always returns a string.
pub fn lookup(query: &str) -> &'static str {
    let query = query.to_lowercase();
    TOPICS
        .iter()
        .find(|topic| topic.keywords.iter().any(|kw| query.contains(kw)))
        .map(|topic| topic.explanation)
        .unwrap_or(GENERIC)
}
