//! Join kinds and their SQL keywords.

/// The type of JOIN operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum JoinKind {
    /// Plain `JOIN`
    #[default]
    Inner,
    Left,
    Right,
    Cross,
    NaturalLeft,
    NaturalRight,
    /// MySQL `STRAIGHT_JOIN`
    Straight,
}

impl JoinKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            JoinKind::Inner => "JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Cross => "CROSS JOIN",
            JoinKind::NaturalLeft => "NATURAL LEFT JOIN",
            JoinKind::NaturalRight => "NATURAL RIGHT JOIN",
            JoinKind::Straight => "STRAIGHT_JOIN",
        }
    }

    /// Natural joins take no `ON` predicate.
    pub const fn is_natural(&self) -> bool {
        matches!(self, JoinKind::NaturalLeft | JoinKind::NaturalRight)
    }

    /// Parses a join keyword such as `LEFT JOIN` or `left`, ignoring case and
    /// surrounding whitespace.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_ascii_uppercase();
        let normalized = normalized.split_whitespace().collect::<Vec<_>>().join(" ");
        let kind = match normalized.trim_end_matches(" JOIN") {
            "JOIN" | "INNER" => JoinKind::Inner,
            "LEFT" | "LEFT OUTER" => JoinKind::Left,
            "RIGHT" | "RIGHT OUTER" => JoinKind::Right,
            "CROSS" => JoinKind::Cross,
            "NATURAL LEFT" => JoinKind::NaturalLeft,
            "NATURAL RIGHT" => JoinKind::NaturalRight,
            "STRAIGHT_JOIN" | "STRAIGHT" => JoinKind::Straight,
            _ => return None,
        };
        Some(kind)
    }
}

impl core::fmt::Display for JoinKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
