use crate::sheet::{Cell, Row};
use serde::Serialize;

/// Render model for one marksheet: first row as header, the rest as body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableView {
    pub header: Vec<Cell>,
    pub rows: Vec<Row>,
    pub column_count: usize,
}

impl TableView {
    pub fn from_rows(data: &[Row]) -> Self {
        let Some((header, body)) = data.split_first() else {
            return Self {
                header: Vec::new(),
                rows: Vec::new(),
                column_count: 0,
            };
        };
        Self {
            header: header.clone(),
            rows: body.to_vec(),
            column_count: column_count(data),
        }
    }
}

pub fn column_count(data: &[Row]) -> usize {
    data.iter().map(Vec::len).max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_split_and_ragged_width() {
        let data = vec![
            vec![Cell::Text("Name".into()), Cell::Text("Mark".into())],
            vec![
                Cell::Text("Ada".into()),
                Cell::Number(91.0),
                Cell::Text("late".into()),
            ],
            vec![],
        ];
        let view = TableView::from_rows(&data);
        assert_eq!(view.header.len(), 2);
        assert_eq!(view.rows.len(), 2);
        assert_eq!(view.column_count, 3);
    }

    #[test]
    fn empty_marksheet_renders_empty() {
        let view = TableView::from_rows(&[]);
        assert!(view.header.is_empty());
        assert!(view.rows.is_empty());
        assert_eq!(view.column_count, 0);
    }
}
