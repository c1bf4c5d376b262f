use serde::Deserialize;

pub const DEFAULT_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,  // defaults to 100
    pub offset: Option<i64>, // defaults to 0
}

impl Pagination {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
        }
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).max(0)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        let page = Pagination::default();
        assert_eq!(page.limit(), 100);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn negative_values_are_clamped() {
        let page = Pagination::new(-5, -1);
        assert_eq!(page.limit(), 0);
        assert_eq!(page.offset(), 0);
    }
}
