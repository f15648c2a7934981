//! Optional post-pass ordering of matrix rows by one row field.

use serde::{Deserialize, Serialize};

use super::engine::PivotMatrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Active sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// At most one active sort key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortState {
    active: Option<SortKey>,
}

impl SortState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same field cycles asc -> desc -> unsorted; another field starts at asc.
    pub fn toggle(&mut self, field: &str) {
        self.active = match self.active.take() {
            Some(key) if key.field == field => match key.direction {
                SortDirection::Asc => Some(SortKey::desc(field)),
                SortDirection::Desc => None,
            },
            _ => Some(SortKey::asc(field)),
        };
    }

    pub fn set(&mut self, key: Option<SortKey>) {
        self.active = key;
    }

    pub fn active(&self) -> Option<&SortKey> {
        self.active.as_ref()
    }

    pub fn clear(&mut self) {
        self.active = None;
    }

    pub fn apply(&self, matrix: &mut PivotMatrix) {
        if let Some(key) = &self.active {
            sort_rows(matrix, key);
        }
    }
}

/// Stable sort of `matrix.rows` by one row field. Unknown fields are a no-op.
pub fn sort_rows(matrix: &mut PivotMatrix, key: &SortKey) {
    let Some(index) = matrix.row_field_index(&key.field) else {
        return;
    };

    matrix.rows.sort_by(|a, b| {
        let ord = a.group_key[index].cmp(&b.group_key[index]);
        match key.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;
    use crate::pivot::{build_matrix, join_key, AggregationFunction, ValueField};

    fn matrix() -> PivotMatrix {
        let rows = vec![
            Record::new().with("region", "West").with("rank", 2.0).with("v", 1.0),
            Record::new().with("region", "East").with("rank", 10.0).with("v", 1.0),
            Record::new().with("region", "North").with("rank", 2.0).with("v", 1.0),
            Record::new().with("region", "South").with("v", 1.0),
        ];
        build_matrix(
            &rows,
            &["rank".to_string(), "region".to_string()],
            &[],
            &[ValueField::new("v", AggregationFunction::Sum)],
            &[],
        )
    }

    fn order(m: &PivotMatrix) -> Vec<String> {
        m.rows.iter().map(|r| join_key(&r.group_key)).collect()
    }

    #[test]
    fn test_toggle_cycle() {
        let mut state = SortState::new();
        state.toggle("region");
        assert_eq!(state.active(), Some(&SortKey::asc("region")));
        state.toggle("region");
        assert_eq!(state.active(), Some(&SortKey::desc("region")));
        state.toggle("region");
        assert_eq!(state.active(), None);

        state.toggle("region");
        state.toggle("product");
        assert_eq!(state.active(), Some(&SortKey::asc("product")));
    }

    #[test]
    fn test_numeric_ordering_and_stability() {
        let mut m = matrix();
        sort_rows(&mut m, &SortKey::asc("rank"));
        // numeric, not lexicographic; ties keep original order
        assert_eq!(order(&m), vec!["|South", "2|West", "2|North", "10|East"]);

        let mut m = matrix();
        sort_rows(&mut m, &SortKey::desc("rank"));
        assert_eq!(order(&m), vec!["10|East", "2|West", "2|North", "|South"]);
    }

    #[test]
    fn test_text_ordering() {
        let mut m = matrix();
        sort_rows(&mut m, &SortKey::asc("region"));
        assert_eq!(order(&m), vec!["10|East", "2|North", "|South", "2|West"]);
    }

    #[test]
    fn test_unknown_field_is_noop() {
        let mut m = matrix();
        let before = order(&m);
        sort_rows(&mut m, &SortKey::asc("missing"));
        assert_eq!(order(&m), before);
    }
}
